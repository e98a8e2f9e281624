#![no_main]
use libfuzzer_sys::fuzz_target;
use arbitrary::Unstructured;
use jasminsmith::{generate_with, GeneratorConfig, Token, UnstructuredOracle};

fuzz_target!(|data: &[u8]| {
    let config = GeneratorConfig::default();

    let mut oracle = UnstructuredOracle::new(Unstructured::new(data), &config);
    let first = generate_with(&mut oracle, &config).unwrap();

    let mut oracle = UnstructuredOracle::new(Unstructured::new(data), &config);
    let second = generate_with(&mut oracle, &config).unwrap();

    // the same bytes have to drive the walker down the same path
    assert_eq!(first, second);
    assert!(first.iter().all(|t| !matches!(t, Token::Type(_))));
});
