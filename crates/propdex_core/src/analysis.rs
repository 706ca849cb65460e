//! Text analysis for indexed field values and query terms.
//!
//! Indexing and querying run the same [`Analyzer`], so a term typed in a
//! query normalizes to the token stored for the value. Tokens are split on
//! whitespace and punctuation; connector characters (`.`, `_`, `-`, `'`,
//! `@`) stay inside a token when both neighbours are alphanumeric, which
//! keeps values such as `1.0`, `john.doe@example.com` and `embeddedField1`
//! whole. A `-` or `+` directly in front of a digit at the start of a token
//! is kept as the number's sign, so `-5` and `5` stay distinct terms.

/// Characters kept inside a token when surrounded by alphanumerics.
const CONNECTORS: [char; 5] = ['.', '_', '-', '\'', '@'];

/// Characters kept as a leading sign when followed by a digit.
const SIGNS: [char; 2] = ['-', '+'];

/// Configuration for the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerConfig {
    /// Minimum token length (in characters) to index.
    pub min_token_length: usize,
    /// Maximum token length (in characters) to index.
    pub max_token_length: usize,
    /// Whether tokens are lowercased.
    pub case_insensitive: bool,
    /// Additional characters to treat as separators.
    pub extra_separators: Vec<char>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            min_token_length: 1,
            max_token_length: 255,
            case_insensitive: true,
            extra_separators: vec![],
        }
    }
}

impl TokenizerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets minimum token length.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_token_length = len;
        self
    }

    /// Sets maximum token length.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_token_length = len;
        self
    }

    /// Makes matching case sensitive.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_insensitive = false;
        self
    }

    /// Adds extra separator characters.
    #[must_use]
    pub fn with_separators(mut self, chars: &[char]) -> Self {
        self.extra_separators.extend_from_slice(chars);
        self
    }
}

/// A token and its position in the analyzed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Normalized token text.
    pub text: String,
    /// Zero-based position in the token stream.
    pub position: u32,
}

/// Splits and normalizes field text.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: TokenizerConfig,
}

impl Analyzer {
    /// Creates an analyzer with the given configuration.
    #[must_use]
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    /// Returns the tokenizer configuration.
    #[must_use]
    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Normalizes a single already-split term (case folding only).
    #[must_use]
    pub fn normalize(&self, term: &str) -> String {
        if self.config.case_insensitive {
            term.to_lowercase()
        } else {
            term.to_string()
        }
    }

    /// Tokenizes text into normalized terms.
    #[must_use]
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.tokens(text).into_iter().map(|t| t.text).collect()
    }

    /// Tokenizes text into normalized tokens with positions.
    #[must_use]
    pub fn tokens(&self, text: &str) -> Vec<Token> {
        let chars: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();
        let mut current = String::new();

        for (i, &c) in chars.iter().enumerate() {
            if self.is_separator(&chars, i) {
                self.emit(&mut current, &mut tokens);
            } else {
                current.push(c);
            }
        }
        self.emit(&mut current, &mut tokens);

        tokens
    }

    fn is_separator(&self, chars: &[char], i: usize) -> bool {
        let c = chars[i];
        if c.is_whitespace() || self.config.extra_separators.contains(&c) {
            return true;
        }
        let prev = i.checked_sub(1).map(|p| chars[p]);
        let next = chars.get(i + 1).copied();
        if SIGNS.contains(&c)
            && !matches!(prev, Some(p) if p.is_alphanumeric())
            && matches!(next, Some(n) if n.is_ascii_digit())
        {
            return false;
        }
        if CONNECTORS.contains(&c) {
            let joined = matches!(prev, Some(p) if p.is_alphanumeric())
                && matches!(next, Some(n) if n.is_alphanumeric());
            return !joined;
        }
        !c.is_alphanumeric()
    }

    fn emit(&self, current: &mut String, tokens: &mut Vec<Token>) {
        if current.is_empty() {
            return;
        }
        let len = current.chars().count();
        if len >= self.config.min_token_length && len <= self.config.max_token_length {
            let position = tokens.len() as u32;
            tokens.push(Token {
                text: self.normalize(current),
                position,
            });
        }
        current.clear();
    }
}
