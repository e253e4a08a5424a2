//! Fixed report sections.
//!
//! Every report renders all of these, in this order, whatever ran. A section
//! whose metric was not produced shows "could not analyze".

/// `(section name, metric key)` pairs in presentation order.
pub const SECTIONS: [(&str, &str); 6] = [
    ("Vulnerabilities", "vulnerabilities"),
    ("Unsafe-Code", "unsafe_usages"),
    ("Panic-Points", "panic_points"),
    ("Crypto-Patterns", "crypto_patterns"),
    ("Concurrency-Patterns", "concurrency_patterns"),
    ("Raw-Pointer-Usage", "raw_pointer_usages"),
];

/// Whether `key` feeds one of the fixed sections.
pub fn is_section_key(key: &str) -> bool {
    SECTIONS.iter().any(|(_, k)| *k == key)
}
