//! Golden test vectors for digest conversion and hashquery encoding.
//!
//! Each vector pins the field element a digest maps to and the exact request
//! body a hashquery for that single element produces.

use sks_recon_core::Zp;
use sks_recon_hashquery::encode_request;

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct DigestVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Hex digest as reported by the key store.
    pub digest: &'static str,
    /// Expected field element, in decimal.
    pub element: &'static str,
    /// Expected element bytes on the hashquery wire (hex).
    pub wire_element: &'static str,
    /// Expected request body for a one-element hashquery (hex).
    pub request: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<DigestVector> {
    vec![
        DigestVector {
            name: "md5 of the empty string",
            digest: "d41d8cd98f00b204e9800998ecf8427e",
            element: "167830467844043968176572005485231480276",
            wire_element: "d41d8cd98f00b204e9800998ecf8427e",
            request: "0000000100000010d41d8cd98f00b204e9800998ecf8427e",
        },
        DigestVector {
            name: "ascending bytes",
            digest: "00112233445566778899aabbccddeeff",
            element: "340193404210632335760508365704335069440",
            wire_element: "00112233445566778899aabbccddeeff",
            request: "000000010000001000112233445566778899aabbccddeeff",
        },
        DigestVector {
            name: "all ones, below the modulus",
            digest: "ffffffffffffffffffffffffffffffff",
            element: "340282366920938463463374607431768211455",
            wire_element: "ffffffffffffffffffffffffffffffff",
            request: "0000000100000010ffffffffffffffffffffffffffffffff",
        },
        DigestVector {
            name: "single byte, zero padded",
            digest: "01",
            element: "1",
            wire_element: "01000000000000000000000000000000",
            request: "000000010000001001000000000000000000000000000000",
        },
        DigestVector {
            name: "seventeen bytes, reduced modulo p",
            digest: "ffffffffffffffffffffffffffffffffff",
            element: "108172045297465755782986164709634409139",
            wire_element: "b30221d6dc40ce27a394df2a992d6151",
            request: "0000000100000010b30221d6dc40ce27a394df2a992d6151",
        },
    ]
}

/// Check every vector, returning `(name, matches, detail)`.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| match check_vector(v) {
            Ok(()) => (v.name.to_string(), true, String::new()),
            Err(detail) => (v.name.to_string(), false, detail),
        })
        .collect()
}

fn check_vector(v: &DigestVector) -> Result<(), String> {
    let z = Zp::from_digest(v.digest).map_err(|e| e.to_string())?;

    let element = z.to_string();
    if element != v.element {
        return Err(format!("element {} != {}", element, v.element));
    }

    let wire = z.to_digest();
    if wire != v.wire_element {
        return Err(format!("wire element {} != {}", wire, v.wire_element));
    }

    let request = encode_request(&[z]).map_err(|e| e.to_string())?;
    let request = hex::encode(request);
    if request != v.request {
        return Err(format!("request {} != {}", request, v.request));
    }
    Ok(())
}
