//! Comparator scenarios over realistic baseline/cloud OCR text pairs.

use ocr_audit::{compare_sources, find_matches, TextSource};

const BASELINE: &str = "OXFORD, Miss. \u{FFFD}AP) - Federal marshals escorted\n\
J a m e s Meredith to the registrar on Monday. A crowd\n\
waited outside while Mere dith signed the forms and\n\
Meredith then left under guard.";

const CLOUD_OCR: &str = "OXFORD, Miss. (AP) - Federal marshals escorted\n\
James Meredith to the registrar on Monday. A crowd\n\
waited outside while Meredith signed the forms and\n\
Meredith then left under guard.";

#[test]
fn single_word_counts_differ_between_sources() {
    let report = compare_sources(BASELINE, CLOUD_OCR, "Meredith", 10);
    assert_eq!(report.baseline.len(), 2);
    assert_eq!(report.cloud_ocr.len(), 3);
    assert_eq!(report.baseline.source, TextSource::Baseline);
    assert_eq!(report.cloud_ocr.source, TextSource::CloudOcr);
}

#[test]
fn full_name_only_found_in_cloud_ocr() {
    let baseline = find_matches(TextSource::Baseline, BASELINE, "James Meredith", 10);
    let cloud = find_matches(TextSource::CloudOcr, CLOUD_OCR, "James Meredith", 10);
    assert!(baseline.is_empty());
    assert_eq!(cloud.len(), 1);

    let m = &cloud.matches[0];
    assert_eq!(m.matched_phrase, "James Meredith");
    assert_eq!(m.preceding_context, " escorted\n");
    assert_eq!(m.following_context, " to the re");
    assert_eq!(&CLOUD_OCR[m.offset..m.offset + m.matched_phrase.len()], "James Meredith");
}

#[test]
fn matches_are_in_document_order() {
    let report = find_matches(TextSource::CloudOcr, CLOUD_OCR, "Meredith", 4);
    let offsets: Vec<usize> = report.matches.iter().map(|m| m.offset).collect();
    let mut sorted = offsets.clone();
    sorted.sort_unstable();
    assert_eq!(offsets, sorted);
    assert_eq!(report.matches[1].preceding_context, "ile ");
}

#[test]
fn profiles_expose_baseline_defects() {
    let report = compare_sources(BASELINE, CLOUD_OCR, "Meredith", 10);
    assert_eq!(report.baseline_profile.unknown_markers, 1);
    assert_eq!(report.cloud_ocr_profile.unknown_markers, 0);
    assert_eq!(report.baseline_profile.spaced_letter_runs, 1);
    assert_eq!(report.cloud_ocr_profile.spaced_letter_runs, 0);
    assert_eq!(report.baseline_profile.line_count, 4);
}

#[test]
fn absent_phrase_reports_nothing_in_either_source() {
    let report = compare_sources(BASELINE, CLOUD_OCR, "Barnett", 10);
    assert!(report.baseline.is_empty());
    assert!(report.cloud_ocr.is_empty());
}

#[test]
fn report_serialises_for_json_output() {
    let report = compare_sources(BASELINE, CLOUD_OCR, "James Meredith", 10);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["phrase"], "James Meredith");
    assert_eq!(json["cloud_ocr"]["matches"].as_array().unwrap().len(), 1);
    assert_eq!(json["baseline"]["matches"].as_array().unwrap().len(), 0);
}
