//! Preparation of user queries for FTS5 `MATCH`.

/// Columns accepted in a `column:term` filter.
const COLUMNS: [&str; 2] = ["title", "content"];

/// Upper-case keywords that make parentheses meaningful.
const OPERATORS: [&str; 4] = ["AND", "OR", "NOT", "NEAR"];

/// Turns a raw user query into an FTS5 match expression.
///
/// Outside double quotes, punctuation and every kind of whitespace become a
/// plain space, so they separate terms the same way the unicode61 tokenizer
/// does at index time. A few characters keep their FTS5 meaning, but only in
/// the position where FTS5 expects them:
///
/// - `:` directly after a known column name (`title:`, `content:`)
/// - `*` directly after a term (prefix match)
/// - `^` at the start of a term (initial-token match)
/// - `(` and `)` when the query uses an upper-case `AND`/`OR`/`NOT`/`NEAR`
///
/// Quoted phrases are passed through untouched, which also leaves an
/// unbalanced quote in place for the engine to reject. Returns `None` when
/// nothing searchable remains.
pub(crate) fn prepare_match_query(raw: &str) -> Option<String> {
    let grouping = has_boolean_operator(raw);
    let mut prepared = String::with_capacity(raw.len());
    let mut word = String::new();
    let mut in_phrase = false;
    let mut chars = raw.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_phrase {
            in_phrase = ch != '"';
            prepared.push(ch);
            continue;
        }

        if is_word_char(ch) {
            word.push(ch);
            prepared.push(ch);
            continue;
        }

        let keep = match ch {
            '"' => {
                in_phrase = true;
                true
            }
            ':' => is_column(&word),
            '*' => !word.is_empty(),
            '^' => at_term_start(&prepared) && chars.peek().is_some_and(|&next| is_word_char(next)),
            '(' | ')' => grouping,
            _ => false,
        };

        word.clear();
        prepared.push(if keep { ch } else { ' ' });
    }

    let trimmed = prepared.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_column(word: &str) -> bool {
    COLUMNS.iter().any(|column| column.eq_ignore_ascii_case(word))
}

fn at_term_start(prepared: &str) -> bool {
    prepared
        .chars()
        .next_back()
        .is_none_or(|prev| prev == ' ' || prev == '(' || prev == ':')
}

/// Returns true if an upper-case boolean keyword appears outside quotes.
fn has_boolean_operator(raw: &str) -> bool {
    let mut in_phrase = false;
    let outside: String = raw
        .chars()
        .map(|ch| {
            if ch == '"' {
                in_phrase = !in_phrase;
                ' '
            } else if in_phrase {
                ' '
            } else {
                ch
            }
        })
        .collect();

    outside
        .split(|ch: char| !is_word_char(ch))
        .any(|word| OPERATORS.contains(&word))
}
