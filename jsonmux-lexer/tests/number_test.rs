use jsonmux_lexer::NumberAccumulator;

fn run(s: &str) -> jsonmux_lexer::Result<(String, jsonmux_lexer::NumberShape)> {
    let mut chars = s.chars();
    let mut acc = NumberAccumulator::start(chars.next().unwrap())?;
    for c in chars {
        if !acc.feed(c)? {
            break;
        }
    }
    acc.finish()
}

#[test]
fn large_integer_round_trips_as_text() {
    let (raw, shape) = run("9223372036854775807").unwrap();
    assert_eq!(raw, "9223372036854775807");
    assert!(shape.is_integral());
}

#[test]
fn negative_float_with_exponent() {
    let (raw, shape) = run("-12.34e+5").unwrap();
    assert_eq!(raw, "-12.34e+5");
    assert!(shape.has_fraction);
    assert!(shape.has_exponent);
}

#[test]
fn rejects_double_leading_zero() {
    assert!(run("00").is_err());
}
