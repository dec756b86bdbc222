mod common;

use delinquency_core::metrics::{evaluate, roc_auc, ConfusionMatrix};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn fixture_labels() -> Vec<u8> {
    common::ROWS.iter().map(|r| r[10] as u8).collect()
}

fn fixture_scores() -> Vec<f64> {
    common::ROWS.iter().map(|r| r[9]).collect()
}

fn thresholded(scores: &[f64]) -> Vec<u8> {
    scores.iter().map(|&p| u8::from(p > 0.5)).collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn confusion_matrix_counts_each_cell() {
    let cm = ConfusionMatrix::from_labels(&[0, 0, 1, 1, 1], &[0, 1, 0, 1, 1]).unwrap();
    assert_eq!(
        (cm.true_negatives, cm.false_positives, cm.false_negatives, cm.true_positives),
        (1, 1, 1, 2)
    );
    assert_eq!(cm.total(), 5);
    assert!(common::approx(cm.accuracy(), 0.6));
    assert!(common::approx(cm.precision(), 2.0 / 3.0));
    assert!(common::approx(cm.recall(), 2.0 / 3.0));
    assert!(common::approx(cm.f1(), 2.0 / 3.0));
}

/// No predicted positives means precision, recall and F1 all fall back to 0.
#[test]
fn zero_denominators_report_zero() {
    let cm = ConfusionMatrix::from_labels(&[0, 0, 1], &[0, 0, 0]).unwrap();
    assert_eq!(cm.precision(), 0.0);
    assert_eq!(cm.recall(), 0.0);
    assert_eq!(cm.f1(), 0.0);
    assert!(common::approx(cm.accuracy(), 2.0 / 3.0));
}

#[test]
fn mismatched_lengths_are_rejected() {
    assert!(ConfusionMatrix::from_labels(&[0, 1], &[0]).is_err());
    assert!(roc_auc(&[0, 1], &[0.5]).is_err());
}

#[test]
fn auc_of_perfect_and_inverted_rankings() {
    assert_eq!(roc_auc(&[0, 0, 1, 1], &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
    assert_eq!(roc_auc(&[1, 1, 0, 0], &[0.1, 0.2, 0.8, 0.9]).unwrap(), 0.0);
}

/// Tied scores split the credit evenly.
#[test]
fn auc_averages_tied_ranks() {
    assert_eq!(roc_auc(&[0, 1], &[0.5, 0.5]).unwrap(), 0.5);
    assert_eq!(roc_auc(&[0, 1, 1], &[0.3, 0.3, 0.9]).unwrap(), 0.75);
}

#[test]
fn auc_needs_both_classes() {
    assert!(roc_auc(&[1, 1, 1], &[0.1, 0.5, 0.9]).is_err());
    assert!(roc_auc(&[], &[]).is_err());
}

/// Only one positive/negative pair of sixteen is ordered correctly in the
/// fixture, and half the predictions are wrong.
#[test]
fn evaluate_over_fixture_dataset() {
    let scores = fixture_scores();
    let report = evaluate(&fixture_labels(), &thresholded(&scores), &scores).unwrap();

    assert_eq!(
        (
            report.confusion.true_negatives,
            report.confusion.false_positives,
            report.confusion.false_negatives,
            report.confusion.true_positives,
        ),
        (1, 3, 3, 1)
    );
    assert_eq!(report.accuracy, 0.25);
    assert_eq!(report.precision, 0.25);
    assert_eq!(report.recall, 0.25);
    assert_eq!(report.f1_score, 0.25);
    assert_eq!(report.auc, 0.0625);
}
