use regex::Regex;

/// Shell-style wildcard used by wildcard includes.
///
/// `*` matches any run of characters (including `/`), `?` matches one
/// character, `[abc]` / `[!abc]` match a character class. The pattern is
/// translated into an anchored regex; an unterminated `[` is literal.
#[derive(Debug, Clone)]
pub(crate) struct GlobPattern {
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> Self {
        let translated = translate(&normalize_separators(pattern));
        let regex = Regex::new(&translated).unwrap_or_else(|_| {
            Regex::new(&format!("^{}$", regex::escape(pattern))).expect("escaped literal is valid")
        });
        Self { regex }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(&normalize_separators(name))
    }
}

pub(crate) fn is_wildcard(name: &str) -> bool {
    name.contains('*') || name.contains('?')
}

pub(crate) fn normalize_separators(name: &str) -> String {
    name.replace('\\', "/")
}

fn translate(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut index = 0;
    while index < chars.len() {
        match chars[index] {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => match class_end(&chars, index) {
                Some(end) => {
                    let mut body: String = chars[index + 1..end].iter().collect();
                    let negated = body.starts_with('!');
                    if negated {
                        body.remove(0);
                    }
                    out.push('[');
                    if negated {
                        out.push('^');
                    }
                    for ch in body.chars() {
                        if matches!(ch, '\\' | '[' | ']' | '^' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(ch);
                    }
                    out.push(']');
                    index = end;
                }
                None => out.push_str(r"\["),
            },
            other => out.push_str(&regex::escape(&other.to_string())),
        }
        index += 1;
    }
    out.push('$');
    out
}

/// Index of the `]` closing the class opened at `start`, if any.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut index = start + 1;
    if chars.get(index) == Some(&'!') {
        index += 1;
    }
    // A leading `]` belongs to the class body.
    if chars.get(index) == Some(&']') {
        index += 1;
    }
    while index < chars.len() {
        if chars[index] == ']' {
            return Some(index);
        }
        index += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_and_question_mark() {
        let pattern = GlobPattern::new("noise/*.glsl");
        assert!(pattern.matches("noise/perlin.glsl"));
        assert!(pattern.matches("noise\\value.glsl"));
        assert!(!pattern.matches("warp/swirl.glsl"));

        let single = GlobPattern::new("blend_?.glsl");
        assert!(single.matches("blend_a.glsl"));
        assert!(!single.matches("blend_ab.glsl"));
    }

    #[test]
    fn character_classes() {
        let pattern = GlobPattern::new("octave[12].glsl");
        assert!(pattern.matches("octave1.glsl"));
        assert!(!pattern.matches("octave3.glsl"));

        let negated = GlobPattern::new("octave[!12].glsl");
        assert!(negated.matches("octave3.glsl"));
        assert!(!negated.matches("octave1.glsl"));
    }

    #[test]
    fn dots_are_literal() {
        let pattern = GlobPattern::new("*.glsl");
        assert!(!pattern.matches("fragment_glsl"));
        assert!(GlobPattern::new("a[.glsl").matches("a[.glsl"));
    }
}
