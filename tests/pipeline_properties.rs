//! Property-based tests for the conversion driver

use fast_convert2bed::core::ConvertError;
use fast_convert2bed::formats::{GffMapper, GffOptions, SamMapper, SamOptions};
use fast_convert2bed::pipeline::convert_stream;
use proptest::prelude::*;

/// One input line: either a SAM header or an alignment at a position
#[derive(Debug, Clone)]
enum Line {
    Header(String),
    Read(u64),
}

fn arb_line() -> impl Strategy<Value = Line> {
    prop_oneof![
        1 => "@CO\t[a-z ]{0,12}".prop_map(Line::Header),
        4 => (1u64..1_000_000).prop_map(Line::Read),
    ]
}

fn render(lines: &[Line]) -> String {
    let mut text = String::new();
    for (n, line) in lines.iter().enumerate() {
        match line {
            Line::Header(h) => text.push_str(h),
            Line::Read(pos) => text.push_str(&format!(
                "read{}\t0\tchr1\t{}\t60\t3M\t*\t0\t0\tACG\tIII",
                n, pos
            )),
        }
        text.push('\n');
    }
    text
}

fn convert(input: &str, threads: usize, keep_header: bool) -> String {
    let mut mapper = SamMapper::new(SamOptions {
        keep_header,
        ..Default::default()
    });
    let mut out = Vec::new();
    convert_stream(input.as_bytes(), &mut out, &mut mapper, threads).unwrap();
    String::from_utf8(out).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Output follows input order whatever the thread count
    #[test]
    fn prop_order_preserved(lines in prop::collection::vec(arb_line(), 0..200), threads in 2usize..6) {
        let input = render(&lines);
        let sequential = convert(&input, 1, true);
        prop_assert_eq!(convert(&input, threads, true), sequential.clone());

        let expected: Vec<String> = lines
            .iter()
            .enumerate()
            .filter_map(|(n, l)| match l {
                Line::Read(pos) => Some(format!("chr1\t{}\t{}\tread{}", pos - 1, pos + 2, n)),
                Line::Header(_) => None,
            })
            .collect();
        let actual: Vec<String> = sequential
            .lines()
            .filter(|l| !l.starts_with("_header"))
            .map(|l| l.split('\t').take(4).collect::<Vec<_>>().join("\t"))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    /// Kept headers are numbered 0, 1, 2... in input order
    #[test]
    fn prop_header_numbers_increase(lines in prop::collection::vec(arb_line(), 0..100)) {
        let output = convert(&render(&lines), 1, true);
        let headers: Vec<&Line> = lines.iter().filter(|l| matches!(l, Line::Header(_))).collect();
        let pseudo: Vec<&str> = output.lines().filter(|l| l.starts_with("_header\t")).collect();
        prop_assert_eq!(pseudo.len(), headers.len());
        for (n, (rec, header)) in pseudo.iter().zip(headers).enumerate() {
            if let Line::Header(text) = header {
                prop_assert_eq!(rec.to_string(), format!("_header\t{}\t{}\t{}", n, n + 1, text));
            }
        }
    }

    /// The first bad record stops the run with everything before it written
    #[test]
    fn prop_fail_fast(good in 0usize..50, after in 0usize..50, threads in 1usize..4) {
        let mut input = String::new();
        for n in 0..good {
            input.push_str(&format!("chr1\t.\tgene\t{}\t{}\t.\t+\t.\tID=g{}\n", n + 1, n + 10, n));
        }
        input.push_str("chr1\t.\tgene\tten\t20\t.\t+\t.\tID=bad\n");
        for n in 0..after {
            input.push_str(&format!("chr1\t.\tgene\t{}\t{}\t.\t+\t.\tID=h{}\n", n + 1, n + 10, n));
        }

        let mut mapper = GffMapper::new(GffOptions::default());
        let mut out = Vec::new();
        let err = convert_stream(input.as_bytes(), &mut out, &mut mapper, threads).unwrap_err();
        let at_bad_line = matches!(err, ConvertError::MalformedRecord { line, .. } if line == good + 1);
        prop_assert!(at_bad_line);
        prop_assert_eq!(String::from_utf8(out).unwrap().lines().count(), good);
    }
}

#[test]
fn test_blank_lines_ignored() {
    let input = "\n@HD\tVN:1.6\n\nr1\t0\tchr1\t5\t60\t3M\t*\t0\t0\tACG\tIII\n\n";
    let mut mapper = SamMapper::new(SamOptions::default());
    let mut out = Vec::new();
    let stats = convert_stream(input.as_bytes(), &mut out, &mut mapper, 1).unwrap();
    assert_eq!(stats.lines, 5);
    assert_eq!(stats.records, 1);
    assert_eq!(stats.headers, 1);
    assert_eq!(stats.emitted, 1);
}
