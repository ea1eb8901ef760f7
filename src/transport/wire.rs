//! Frame record encoding.
//!
//! One record per classified image:
//! `<HEX payload>;result=[{"label": "<label>", "confidence": <0.00>}]\n`.
//! The newline is the only delimiter; there is no length prefix.

use alloc::{string::String, vec::Vec};

use crate::pipeline::Classification;

pub const RESULT_DELIMITER: &str = ";result=";
pub const RECORD_TERMINATOR: u8 = b'\n';

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";
// Fixed JSON scaffolding around label and confidence.
const RESULT_JSON_OVERHEAD: usize = 48;

pub fn encode_record(payload: &[u8], classification: &Classification) -> Vec<u8> {
    let mut message = String::with_capacity(
        payload.len() * 2
            + RESULT_DELIMITER.len()
            + classification.label.len()
            + RESULT_JSON_OVERHEAD,
    );
    push_hex(&mut message, payload);
    message.push_str(RESULT_DELIMITER);
    push_result_json(&mut message, classification);
    message.push(RECORD_TERMINATOR as char);
    message.into_bytes()
}

fn push_hex(out: &mut String, bytes: &[u8]) {
    for &byte in bytes {
        push_hex_byte(out, byte);
    }
}

fn push_hex_byte(out: &mut String, byte: u8) {
    out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
    out.push(HEX_DIGITS[(byte & 0x0F) as usize] as char);
}

pub fn push_result_json(out: &mut String, classification: &Classification) {
    out.push_str("[{\"label\": \"");
    push_escaped(out, classification.label);
    out.push_str("\", \"confidence\": ");
    push_confidence(out, classification.confidence);
    out.push_str("}]");
}

/// Confidence rounded half-up to hundredths, clamped to [0, 1].
pub fn confidence_hundredths(confidence: f32) -> u8 {
    if confidence.is_nan() || confidence <= 0.0 {
        return 0;
    }
    if confidence >= 1.0 {
        return 100;
    }
    (confidence * 100.0 + 0.5) as u8
}

/// Shortest decimal form of the rounded value: `0.87`, `0.5`, `1.0`, `0.0`.
pub fn push_confidence(out: &mut String, confidence: f32) {
    let hundredths = confidence_hundredths(confidence);
    if hundredths == 100 {
        out.push_str("1.0");
        return;
    }
    out.push_str("0.");
    out.push(char::from(b'0' + hundredths / 10));
    if hundredths % 10 != 0 {
        out.push(char::from(b'0' + hundredths % 10));
    }
}

fn push_escaped(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (c as u32) < 0x20 => {
                out.push_str("\\u00");
                push_hex_byte(out, c as u8);
            }
            c => out.push(c),
        }
    }
}
