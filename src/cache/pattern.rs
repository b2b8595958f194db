//! Glob Pattern Module
//!
//! Key matching for pattern invalidation. `*` matches any (possibly empty)
//! sequence, `?` matches exactly one character, everything else is literal.

/// Returns true if `key` matches the glob `pattern`.
///
/// Linear-time two-pointer matcher: on mismatch it backtracks to the most
/// recent `*` and lets it absorb one more character.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let key: Vec<char> = key.chars().collect();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while k < key.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == key[k]) {
            p += 1;
            k += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = k;
            p += 1;
        } else if let Some(s) = star {
            p = s + 1;
            resume += 1;
            k = resume;
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert!(glob_match("category:1:true", "category:1:true"));
        assert!(!glob_match("category:1:true", "category:1:false"));
    }

    #[test]
    fn test_trailing_star() {
        assert!(glob_match("products:*", "products:0:100:all:false"));
        assert!(glob_match("products:*", "products:"));
        assert!(!glob_match("products:*", "product:1:true"));
        assert!(!glob_match("product:*", "products:0:100:all:false"));
    }

    #[test]
    fn test_inner_star() {
        assert!(glob_match("categories:*:true", "categories:0:100:true"));
        assert!(!glob_match("categories:*:true", "categories:0:100:false"));
        assert!(glob_match("product:*:true", "product:42:true"));
        assert!(!glob_match("product:*:true", "product:42"));
    }

    #[test]
    fn test_question_mark() {
        assert!(glob_match("product:?", "product:7"));
        assert!(!glob_match("product:?", "product:77"));
    }

    #[test]
    fn test_empty() {
        assert!(glob_match("", ""));
        assert!(glob_match("*", ""));
        assert!(!glob_match("", "a"));
    }

    #[test]
    fn test_backtracking() {
        assert!(glob_match("a*b*c", "aXbYbZc"));
        assert!(!glob_match("a*b*c", "aXbYbZ"));
    }
}
