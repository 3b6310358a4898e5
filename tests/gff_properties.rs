//! Property-based tests for GFF3 to BED conversion

use fast_convert2bed::core::ConvertError;
use fast_convert2bed::formats::gff::{GffRecordView, ZERO_LENGTH_INSERTION_ATTR};
use fast_convert2bed::formats::{GffMapper, GffOptions, RecordMapper};
use fast_convert2bed::pipeline::convert_stream;
use proptest::prelude::*;

/// Generate a valid chromosome name
fn arb_chrom_name() -> impl Strategy<Value = String> {
    prop_oneof![
        (1u8..=22).prop_map(|n| format!("chr{}", n)),
        Just("chrX".to_string()),
        Just("chrY".to_string()),
    ]
}

/// Generate a valid GFF source field
fn arb_source() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ensembl".to_string()),
        Just("havana".to_string()),
        Just("refseq".to_string()),
        Just(".".to_string()),
    ]
}

/// Generate a valid GFF feature type
fn arb_feature() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("gene".to_string()),
        Just("mRNA".to_string()),
        Just("exon".to_string()),
        Just("CDS".to_string()),
    ]
}

/// Generate a valid strand field
fn arb_strand() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("+".to_string()),
        Just("-".to_string()),
        Just(".".to_string()),
    ]
}

/// Generate an attributes field, with or without an ID
fn arb_attributes() -> impl Strategy<Value = (Option<String>, String)> {
    (
        proptest::option::of("[a-z]{1,6}[0-9]{1,4}"),
        "[A-Za-z]{1,10}",
    )
        .prop_map(|(id, name)| match id {
            Some(id) => (Some(id.clone()), format!("ID={};Name={}", id, name)),
            None => (None, format!("Parent=tx1;Name={}", name)),
        })
}

prop_compose! {
    fn arb_gff_line()(
        chrom in arb_chrom_name(),
        source in arb_source(),
        feature in arb_feature(),
        start in 1u64..100_000_000,
        len in 0u64..100_000,
        strand in arb_strand(),
        (id, attributes) in arb_attributes(),
    ) -> (String, Option<String>, u64, u64) {
        let end = start + len;
        let line = format!(
            "{}\t{}\t{}\t{}\t{}\t.\t{}\t.\t{}",
            chrom, source, feature, start, end, strand, attributes
        );
        (line, id, start, end)
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Coordinates shift from 1-based closed to 0-based half-open
    #[test]
    fn prop_gff_coordinates((line, _, start, end) in arb_gff_line()) {
        let rec = GffRecordView::parse(&line).unwrap().to_bed();
        prop_assert_eq!(rec.start, start - 1);
        prop_assert_eq!(rec.stop, end);
        prop_assert_eq!(rec.column_count(), 10);
    }

    /// The ID attribute becomes the BED id, `.` when absent
    #[test]
    fn prop_gff_id_column((line, id, _, _) in arb_gff_line()) {
        let rec = GffRecordView::parse(&line).unwrap().to_bed();
        let expected = id.unwrap_or_else(|| ".".to_string());
        prop_assert_eq!(rec.id(), Some(expected.as_str()));
    }

    /// Only start == end features are tagged as zero-length insertions
    #[test]
    fn prop_zero_length_marker((line, _, start, end) in arb_gff_line()) {
        let rec = GffRecordView::parse(&line).unwrap().to_bed();
        let tagged = rec.columns[6].ends_with(ZERO_LENGTH_INSERTION_ATTR);
        prop_assert_eq!(tagged, start == end);
    }

    /// Lines without exactly nine columns fail with a data error
    #[test]
    fn prop_wrong_columns_rejected((line, _, _, _) in arb_gff_line(), extra in 1usize..3) {
        let mapper = GffMapper::new(GffOptions::default());
        let longer = format!("{}{}", line, "\tx".repeat(extra));
        let is_malformed = matches!(mapper.map_record(7, &longer), Err(ConvertError::MalformedRecord { line: 7, .. }));
        prop_assert!(is_malformed);
    }

    /// Header pseudo-records are numbered from 0 in input order
    #[test]
    fn prop_header_numbering(headers in prop::collection::vec("#[#a-z0-9 -]{1,20}", 1..8), (line, _, _, _) in arb_gff_line()) {
        prop_assume!(headers.iter().all(|h| !h.starts_with("##FASTA")));
        let mut input = headers.join("\n");
        input.push('\n');
        input.push_str(&line);
        input.push('\n');

        let mut mapper = GffMapper::new(GffOptions { keep_header: true });
        let mut out = Vec::new();
        convert_stream(input.as_bytes(), &mut out, &mut mapper, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        prop_assert_eq!(lines.len(), headers.len() + 1);
        for (n, header) in headers.iter().enumerate() {
            prop_assert_eq!(lines[n].to_string(), format!("_header\t{}\t{}\t{}", n, n + 1, header));
        }
    }
}

#[test]
fn test_fasta_section_not_converted() {
    let input = "##gff-version 3\nchr1\t.\tgene\t1\t10\t.\t+\t.\tID=g1\n##FASTA\n>chr1\nACGTACGTAC\n";
    let mut mapper = GffMapper::new(GffOptions::default());
    let mut out = Vec::new();
    let stats = convert_stream(input.as_bytes(), &mut out, &mut mapper, 1).unwrap();
    assert_eq!(stats.records, 1);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "chr1\t0\t10\tg1\t.\t+\t.\tgene\t.\tID=g1\n"
    );
}

#[test]
fn test_zero_start_rejected() {
    let mapper = GffMapper::new(GffOptions::default());
    let result = mapper.map_record(1, "chr1\t.\tgene\t0\t10\t.\t+\t.\tID=g1");
    assert!(matches!(result, Err(ConvertError::MalformedRecord { .. })));
}
