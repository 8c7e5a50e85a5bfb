/*!
 * Tests for sentence segmentation
 */

use narrata::sentences::{split_sentences, Sentence};

fn texts(input: &str) -> Vec<String> {
    split_sentences(input)
        .iter()
        .map(|s| s.text().to_string())
        .collect()
}

/// Test that grouped terminators stay with their sentence
#[test]
fn test_split_withMixedTerminators_shouldKeepRunsTogether() {
    assert_eq!(texts("Wait!? Really. Yes..."), vec!["Wait!?", "Really.", "Yes..."]);
}

/// Test text without any terminator
#[test]
fn test_split_withoutTerminator_shouldReturnWholeText() {
    assert_eq!(texts("Just some words"), vec!["Just some words"]);
}

/// Test leading terminators are attached to the first sentence
#[test]
fn test_split_withLeadingTerminators_shouldPrefixFirstSentence() {
    let sentences = split_sentences("...Hello. World");
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].start, 0);
    assert_eq!(sentences[0].text(), "...Hello.");
    assert_eq!(sentences[1].text(), "World");
}

/// Test a stray terminator run between sentences produces no empty sentence
#[test]
fn test_split_withStrayEllipsis_shouldFoldIntoPreviousSentence() {
    let sentences = split_sentences("One. ... Two.");
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].raw(), "One. ...");
    assert_eq!(sentences[1].text(), "Two.");
}

/// Test text made only of terminators
#[test]
fn test_split_withOnlyTerminators_shouldReturnSingleSentence() {
    let sentences = split_sentences("?!");
    assert_eq!(sentences.len(), 1);
    assert_eq!(sentences[0].text(), "?!");
}

/// Test that indices follow the order of appearance
#[test]
fn test_split_withSeveralSentences_shouldNumberInOrder() {
    let sentences = split_sentences("A. B. C. D.");
    let indices: Vec<usize> = sentences.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}

/// Test that segmentation never drops or duplicates text
#[test]
fn test_split_withVariousInputs_shouldBeLossless() {
    let inputs = [
        "Hello world. This is a test!",
        "  Leading space. Trailing space.   ",
        "¿Qué tal? Muy bien, gracias. ¡Adiós!",
        "...Dots first. Then words",
        "Line one.\nLine two?\n\nLine three!",
    ];

    for input in inputs {
        let sentences = split_sentences(input);
        let rebuilt: String = sentences.iter().map(Sentence::raw).collect();
        assert_eq!(rebuilt, input, "segmentation of {:?} lost text", input);

        for pair in sentences.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for sentence in &sentences {
            assert_eq!(&input[sentence.start..sentence.end], sentence.raw());
            assert!(!sentence.text().is_empty());
        }
    }
}

/// Test multi-byte characters keep valid offsets
#[test]
fn test_split_withAccentedText_shouldReturnCharBoundaries() {
    let sentences = split_sentences("¿Qué tal? Bien.");
    assert_eq!(sentences.len(), 2);
    assert_eq!(sentences[0].text(), "¿Qué tal?");
    assert_eq!(sentences[1].text(), "Bien.");
}
