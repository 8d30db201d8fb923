//! Text normalization applied before tokenizing.
//!
//! The pipeline is: collapse whitespace, lower-case, turn decimal commas into
//! dots, accept `**` as `^`, and finally rewrite every infix `^` into the call
//! form `pow(left,right)`. Operand boundaries for the rewrite are found by
//! scanning outward from the caret:
//!
//! - a digit/dot run (`2.5^x`),
//! - an identifier run of letters, digits and `_` (`x^2`),
//! - a balanced parenthesis group (`(x+1)^2`). On the left a group that is
//!   the argument list of a call takes the function name with it
//!   (`sin(x)^2`); on the right an identifier followed by a group is taken
//!   as a call (`2^sin(x)`).
//!
//! The right operand may carry a single leading sign (`x^-1`).

use super::functions::accepts_two_args;
use crate::error::ParseError;

const MAX_REWRITE_PASSES: usize = 1000;

/// Normalizes a user formula. Applying it twice yields the same text.
pub fn normalize(input: &str) -> Result<String, ParseError> {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(ParseError::Empty);
    }
    let lowered = collapsed.to_lowercase();
    let dotted = normalize_decimal_commas(&lowered);
    let carets = dotted.replace("**", "^");
    rewrite_powers(&carets)
}

/// Replaces `,` between two digits with `.`, unless the comma separates the
/// arguments of a function that takes two of them (`pow(2,3)`).
fn normalize_decimal_commas(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    // One entry per open paren: does it open a two-argument call?
    let mut groups: Vec<bool> = Vec::new();

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '(' => {
                let name = trailing_identifier(&out);
                groups.push(!name.is_empty() && accepts_two_args(name));
                out.push(c);
            }
            ')' => {
                groups.pop();
                out.push(c);
            }
            ',' => {
                let between_digits = i > 0
                    && chars[i - 1].is_ascii_digit()
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                let separator = groups.last().copied().unwrap_or(false);
                out.push(if between_digits && !separator { '.' } else { ',' });
            }
            _ => out.push(c),
        }
    }
    out
}

fn trailing_identifier(text: &str) -> &str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_alphanumeric() || *c == '_')
        .last()
        .map_or(text.len(), |(i, _)| i);
    let ident = &text[start..];
    if ident.chars().next().is_some_and(char::is_alphabetic) {
        ident
    } else {
        ""
    }
}

fn rewrite_powers(input: &str) -> Result<String, ParseError> {
    let mut chars = strip_spaces_around_carets(input);

    for _ in 0..MAX_REWRITE_PASSES {
        let Some(caret) = chars.iter().position(|&c| c == '^') else {
            return Ok(chars.into_iter().collect());
        };

        let left_start = scan_left(&chars, caret)?;
        let right_end = scan_right(&chars, caret)?;
        let left: String = chars[left_start..caret].iter().collect();
        let right: String = chars[caret + 1..right_end].iter().collect();
        let call = format!("pow({left},{right})");
        chars.splice(left_start..right_end, call.chars());
    }

    Err(ParseError::RewriteLimit(MAX_REWRITE_PASSES))
}

fn strip_spaces_around_carets(input: &str) -> Vec<char> {
    let chars: Vec<char> = input.chars().collect();
    let mut out = Vec::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let before = out.last() == Some(&'^');
            let after = chars.get(i + 1) == Some(&'^');
            if before || after {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the index where the left operand of the caret at `caret` starts.
fn scan_left(chars: &[char], caret: usize) -> Result<usize, ParseError> {
    if caret == 0 {
        return Err(ParseError::MissingPowerOperand("left"));
    }
    let end = caret - 1;
    let c = chars[end];

    if is_number_char(c) {
        return Ok(run_start(chars, caret, is_number_char));
    }
    if c.is_alphabetic() || c == '_' {
        return Ok(run_start(chars, caret, is_ident_char));
    }
    if c == ')' {
        let mut depth = 0usize;
        let mut i = end + 1;
        while i > 0 {
            i -= 1;
            match chars[i] {
                ')' => depth += 1,
                '(' => {
                    depth -= 1;
                    if depth == 0 {
                        // A call's argument list takes the function name along.
                        let name_start = run_start(chars, i, is_ident_char);
                        if name_start < i && chars[name_start].is_alphabetic() {
                            return Ok(name_start);
                        }
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        return Err(ParseError::UnbalancedParens);
    }

    Err(ParseError::MissingPowerOperand("left"))
}

/// Returns the (exclusive) index where the right operand of the caret ends.
fn scan_right(chars: &[char], caret: usize) -> Result<usize, ParseError> {
    let mut pos = caret + 1;
    if matches!(chars.get(pos), Some('-') | Some('+')) {
        pos += 1;
    }
    let Some(&c) = chars.get(pos) else {
        return Err(ParseError::MissingPowerOperand("right"));
    };

    if is_number_char(c) {
        return Ok(run_end(chars, pos, is_number_char));
    }
    if c.is_alphabetic() || c == '_' {
        let end = run_end(chars, pos, is_ident_char);
        if chars.get(end) == Some(&'(') {
            return group_end(chars, end);
        }
        return Ok(end);
    }
    if c == '(' {
        return group_end(chars, pos);
    }

    Err(ParseError::MissingPowerOperand("right"))
}

fn group_end(chars: &[char], open: usize) -> Result<usize, ParseError> {
    let mut depth = 0usize;
    for (i, &c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
    }
    Err(ParseError::UnbalancedParens)
}

/// Start of the run of `pred` characters that ends right before `pos`.
fn run_start(chars: &[char], pos: usize, pred: fn(char) -> bool) -> usize {
    let mut start = pos;
    while start > 0 && pred(chars[start - 1]) {
        start -= 1;
    }
    start
}

fn run_end(chars: &[char], start: usize, pred: fn(char) -> bool) -> usize {
    let mut end = start;
    while end < chars.len() && pred(chars[end]) {
        end += 1;
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> String {
        normalize(text).expect("formula should normalize")
    }

    #[test]
    fn rewrites_simple_powers() {
        assert_eq!(norm("x^2"), "pow(x,2)");
        assert_eq!(norm("x ** 2"), "pow(x,2)");
        assert_eq!(norm("2.5^x"), "pow(2.5,x)");
        assert_eq!(norm("(x+1)^2"), "pow((x+1),2)");
        assert_eq!(norm("x^(y-1)"), "pow(x,(y-1))");
    }

    #[test]
    fn rewrites_calls_and_signed_exponents() {
        assert_eq!(norm("sin(x)^2"), "pow(sin(x),2)");
        assert_eq!(norm("2^sin(x)"), "pow(2,sin(x))");
        assert_eq!(norm("x^-1"), "pow(x,-1)");
        assert_eq!(norm("-x^2"), "-pow(x,2)");
    }

    #[test]
    fn chained_powers_rewrite_left_to_right() {
        assert_eq!(norm("2^3^2"), "pow(pow(2,3),2)");
    }

    #[test]
    fn normalizes_case_whitespace_and_decimal_commas() {
        assert_eq!(norm("  X  +   PI "), "x + pi");
        assert_eq!(norm("2,5*x"), "2.5*x");
        assert_eq!(norm("sin(0,5)"), "sin(0.5)");
        assert_eq!(norm("pow(2,3)"), "pow(2,3)");
        assert_eq!(norm("max(1,5)"), "max(1,5)");
    }

    #[test]
    fn rewrite_is_idempotent() {
        for formula in ["x^3-2*x^2+x-5", "sin(x)^2 + cos(y)^2", "2,5^x", "(x^2+y^2)^0.5"] {
            let once = norm(formula);
            assert_eq!(norm(&once), once, "not idempotent for {formula}");
        }
    }

    #[test]
    fn rejects_dangling_carets() {
        assert_eq!(normalize("^2"), Err(ParseError::MissingPowerOperand("left")));
        assert_eq!(normalize("x^"), Err(ParseError::MissingPowerOperand("right")));
        assert_eq!(normalize("x^(1+2"), Err(ParseError::UnbalancedParens));
        assert_eq!(normalize("   "), Err(ParseError::Empty));
    }
}
