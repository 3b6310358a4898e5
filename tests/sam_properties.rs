//! Property-based tests for SAM to BED conversion

use fast_convert2bed::core::ConvertError;
use fast_convert2bed::formats::{RecordMapper, SamMapper, SamOptions, TagPolicy};
use fast_convert2bed::pipeline::convert_stream;
use proptest::prelude::*;

/// Generate a valid chromosome name
fn arb_chrom_name() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u8..=22).prop_map(|n| format!("chr{}", n)),
        Just("chrX".to_string()),
        Just("chrM".to_string()),
    ]
}

/// Generate a read name
fn arb_qname() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_:]{1,24}"
}

/// Generate a CIGAR together with the SEQ length it describes
fn arb_cigar_and_seq_len() -> impl Strategy<Value = (String, usize)> {
    prop::collection::vec(
        (prop_oneof![Just('M'), Just('I'), Just('D'), Just('S'), Just('=')], 1usize..60),
        1..6,
    )
    .prop_filter("needs a match", |ops| ops.iter().any(|(c, _)| *c == 'M'))
    .prop_map(|ops| {
        let cigar: String = ops.iter().map(|(c, n)| format!("{}{}", n, c)).collect();
        let seq_len = ops
            .iter()
            .filter(|(c, _)| "MIS=".contains(*c))
            .map(|(_, n)| n)
            .sum();
        (cigar, seq_len)
    })
}

/// Generate an accepted optional field
fn arb_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..100).prop_map(|n| format!("NM:i:{}", n)),
        (0u32..500).prop_map(|n| format!("AS:i:{}", n)),
        "[A-Z]{1,8}".prop_map(|s| format!("XS:Z:{}", s)),
        Just("RG:Z:group1".to_string()),
    ]
}

prop_compose! {
    fn arb_sam_line()(
        qname in arb_qname(),
        reverse in any::<bool>(),
        chrom in arb_chrom_name(),
        pos in 1u64..100_000_000,
        mapq in 0u8..=60,
        (cigar, seq_len) in arb_cigar_and_seq_len(),
        pnext in 0u64..100_000_000,
        tlen in -1000i64..1000,
        tags in prop::collection::vec(arb_tag(), 0..4),
    ) -> String {
        let flag = if reverse { 16 } else { 0 };
        let seq = "ACGT".repeat(seq_len / 4 + 1)[..seq_len].to_string();
        let qual = "I".repeat(seq_len);
        let mut line = format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t=\t{}\t{}\t{}\t{}",
            qname, flag, chrom, pos, mapq, cigar, pnext, tlen, seq, qual
        );
        for tag in tags {
            line.push('\t');
            line.push_str(&tag);
        }
        line
    }
}

/// Permute a BED line produced from SAM back into SAM column order
fn bed_to_sam(bed: &str) -> String {
    let f: Vec<&str> = bed.split('\t').collect();
    let pos: u64 = f[1].parse::<u64>().unwrap() + 1;
    let mut sam = vec![
        f[3].to_string(),
        f[4].to_string(),
        f[0].to_string(),
        pos.to_string(),
    ];
    sam.extend(f[6..].iter().map(|s| s.to_string()));
    sam.join("\t")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Mapped, unsplit records round-trip back to the original SAM line
    #[test]
    fn prop_sam_round_trip(line in arb_sam_line()) {
        let mapper = SamMapper::new(SamOptions::default());
        let records = mapper.map_record(1, &line).unwrap();
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(bed_to_sam(&records[0].to_string()), line);
    }

    /// Strand follows the 0x10 flag bit and start is POS - 1
    #[test]
    fn prop_strand_and_start(line in arb_sam_line()) {
        let mapper = SamMapper::new(SamOptions::default());
        let rec = &mapper.map_record(1, &line).unwrap()[0];
        let fields: Vec<&str> = line.split('\t').collect();
        let flag: u16 = fields[1].parse().unwrap();
        let expected = if flag & 16 != 0 { "-" } else { "+" };
        prop_assert_eq!(rec.columns[2].as_str(), expected);
        prop_assert_eq!(rec.start + 1, fields[3].parse::<u64>().unwrap());
        prop_assert!(rec.stop > rec.start);
    }

    /// Unmapped reads only appear with --all-reads
    #[test]
    fn prop_unmapped_needs_all_reads(line in arb_sam_line()) {
        let unmapped = line.replacen("\t0\t", "\t4\t", 1).replacen("\t16\t", "\t20\t", 1);
        let default = SamMapper::new(SamOptions::default());
        prop_assert!(default.map_record(1, &unmapped).unwrap().is_empty());

        let all = SamMapper::new(SamOptions { all_reads: true, ..Default::default() });
        prop_assert_eq!(all.map_record(1, &unmapped).unwrap().len(), 1);
    }

    /// Keys outside the specification, X/Y/Z and the allowlist are data errors
    #[test]
    fn prop_unknown_tag_rejected(line in arb_sam_line(), key in "[A-W][A-Z0-9]") {
        prop_assume!(!fast_convert2bed::formats::SPECIFICATION_SAM_TAGS.contains(&key.as_str()));
        let tagged = format!("{}\t{}:i:5", line, key);

        let strict = SamMapper::new(SamOptions::default());
        let err = strict.map_record(1, &tagged).unwrap_err();
        prop_assert!(err.is_data_error());

        let relaxed = SamMapper::new(SamOptions {
            tags: TagPolicy::from_csv(Some(key.as_str())),
            ..Default::default()
        });
        prop_assert!(relaxed.map_record(1, &tagged).is_ok());
    }
}

#[test]
fn test_ab_tag_fails_conversion() {
    let input = "@HD\tVN:1.6\nr1\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII\tAB:i:5\n";
    let mut mapper = SamMapper::new(SamOptions::default());
    let mut out = Vec::new();
    let err = convert_stream(input.as_bytes(), &mut out, &mut mapper, 1).unwrap_err();
    assert!(matches!(err, ConvertError::InvalidSamTag(ref key) if key == "AB"));
    assert_eq!(err.exit_code(), 65);
    assert!(out.is_empty());
}

#[test]
fn test_keep_header_pseudo_records() {
    let input = "@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:1000\n@PG\tID:bwa\nr1\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII\n";
    let mut mapper = SamMapper::new(SamOptions {
        keep_header: true,
        ..Default::default()
    });
    let mut out = Vec::new();
    convert_stream(input.as_bytes(), &mut out, &mut mapper, 1).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "_header\t0\t1\t@HD\tVN:1.6");
    assert_eq!(lines[1], "_header\t1\t2\t@SQ\tSN:chr1\tLN:1000");
    assert_eq!(lines[2], "_header\t2\t3\t@PG\tID:bwa");
    assert!(lines[3].starts_with("chr1\t99\t103\tr1\t0\t+"));
}

#[test]
fn test_split_ids() {
    let line = "r7\t0\tchr1\t1001\t60\t10M100N20M\t*\t0\t0\t*\t*";
    let mapper = SamMapper::new(SamOptions {
        split: true,
        ..Default::default()
    });
    let recs = mapper.map_record(1, line).unwrap();
    let summary: Vec<(u64, u64, &str)> = recs
        .iter()
        .map(|r| (r.start, r.stop, r.columns[0].as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![(1000, 1010, "r7/1"), (1110, 1130, "r7/2")]
    );
}
