/// A candidate command split the way the policy sees it.
///
/// Splitting is plain whitespace splitting: quotes, escapes and operators are
/// not interpreted, so `ls "my dir"` yields the words `ls`, `"my`, `dir"`.
#[derive(Debug)]
pub struct CommandContext<'a> {
    /// The full command text, untrimmed.
    pub raw: &'a str,
    /// The first word, lower-cased. Empty for a blank command.
    pub program: String,
    /// All whitespace-separated words, including the program.
    pub words: Vec<&'a str>,
}

impl<'a> CommandContext<'a> {
    pub fn from_command(raw: &'a str) -> Self {
        let words: Vec<&str> = raw.split_whitespace().collect();
        let program = words.first().map(|w| w.to_lowercase()).unwrap_or_default();
        Self {
            raw,
            program,
            words,
        }
    }

    /// Words after the program.
    pub fn args(&self) -> &[&'a str] {
        self.words.get(1..).unwrap_or(&[])
    }
}
