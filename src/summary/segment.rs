// Sentence segmentation.
//
// Whitespace runs are collapsed to single spaces, then the text is cut
// wherever sentence-ending punctuation is followed by whitespace. Pieces of
// MIN_SENTENCE_CHARS characters or fewer are dropped; they're usually
// greetings, fragments, or abbreviations split off a real sentence.
//
// Text without any terminal punctuation has no sentences at all. A trailing
// unpunctuated piece is kept when the text has punctuation elsewhere.

use super::MIN_SENTENCE_CHARS;

/// Split `text` into candidate sentences, in reading order.
pub fn segment(text: &str) -> Vec<String> {
    if !text.contains(is_terminal) {
        return Vec::new();
    }

    let collapsed = collapse_whitespace(text);

    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev: Option<char> = None;

    for (i, c) in collapsed.char_indices() {
        if c == ' ' && prev.is_some_and(is_terminal) {
            push_sentence(&mut sentences, &collapsed[start..i]);
            start = i + c.len_utf8();
        }
        prev = Some(c);
    }
    push_sentence(&mut sentences, &collapsed[start..]);

    sentences
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn push_sentence(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if piece.chars().count() > MIN_SENTENCE_CHARS {
        sentences.push(piece.to_string());
    }
}

/// Replace every run of whitespace with a single space. Leading and
/// trailing runs become a single space too; callers trim.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_blank_input() {
        assert!(segment("").is_empty());
        assert!(segment(" \n\t  ").is_empty());
    }

    #[test]
    fn test_splits_on_terminal_punctuation() {
        let text = "The first sentence is long enough to keep around. \
                    Is the second one also long enough to keep? \
                    The third one certainly ends with some excitement!";
        let sentences = segment(text);
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "The first sentence is long enough to keep around.");
        assert_eq!(sentences[1], "Is the second one also long enough to keep?");
        assert_eq!(sentences[2], "The third one certainly ends with some excitement!");
    }

    #[test]
    fn test_unpunctuated_text_has_no_sentences() {
        let text = "hey did anyone finish the homework for the algorithms class yet";
        assert!(segment(text).is_empty());
    }

    #[test]
    fn test_keeps_trailing_piece_without_punctuation() {
        let text = "We met in the library after the lecture ended. \
                    then everyone went home without finishing the slides";
        let sentences = segment(text);
        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[1],
            "then everyone went home without finishing the slides"
        );
    }

    #[test]
    fn test_drops_short_pieces() {
        let text = "Hi all. This sentence is comfortably over thirty characters. Ok!";
        assert_eq!(
            segment(text),
            vec!["This sentence is comfortably over thirty characters.".to_string()]
        );
    }

    #[test]
    fn test_exactly_thirty_chars_is_dropped() {
        // 30 characters including the period
        let piece = "abcdefghij abcdefghij abcdefg.";
        assert_eq!(piece.chars().count(), 30);
        assert!(segment(piece).is_empty());
        assert_eq!(segment(&format!("{piece}x")).len(), 1);
    }

    #[test]
    fn test_collapses_newlines_and_tabs() {
        let text = "Line one of the notes\ncontinues   on the next line.\n\n\tAnd then a second sentence follows here.";
        let sentences = segment(text);
        assert_eq!(
            sentences,
            vec![
                "Line one of the notes continues on the next line.".to_string(),
                "And then a second sentence follows here.".to_string(),
            ]
        );
    }

    #[test]
    fn test_punctuation_without_whitespace_does_not_split() {
        let text = "Version 2.0 of the library shipped today with fixes.";
        assert_eq!(segment(text).len(), 1);
    }

    #[test]
    fn test_multibyte_text_is_counted_by_chars() {
        let text = "Les étudiants ont révisé le chapitre sur l’énergie. Très bien.";
        let sentences = segment(text);
        assert_eq!(sentences, vec!["Les étudiants ont révisé le chapitre sur l’énergie.".to_string()]);
    }
}
