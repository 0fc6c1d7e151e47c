//! Arithmetic over script parameters: `+ - * /`, parentheses, unary minus.

use std::collections::BTreeMap;

/// Deepest nesting of unary signs and parentheses accepted.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' | '-' | '*' | '/' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    i += 1;
                    if i < chars.len() && (chars[i] == '+' || chars[i] == '-') {
                        i += 1;
                    }
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| format!("bad number '{text}'"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    params: &'a BTreeMap<String, f64>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == '*' { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    // factor := '-' factor | '+' factor | number | ident | '(' expr ')'
    fn factor(&mut self) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        self.depth += 1;
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.next() {
            Some(Token::Op('-')) => Ok(-self.factor()?),
            Some(Token::Op('+')) => self.factor(),
            Some(Token::Number(v)) => Ok(v),
            Some(Token::Ident(name)) => self
                .params
                .get(&name)
                .copied()
                .ok_or_else(|| format!("undefined parameter '{name}'")),
            Some(Token::Open) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::Close) => Ok(value),
                    _ => Err("missing ')'".to_string()),
                }
            }
            Some(tok) => Err(format!("unexpected {tok:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Evaluate `input` with `params` as the only names in scope.
pub(crate) fn evaluate(input: &str, params: &BTreeMap<String, f64>) -> Result<f64, String> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        params,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!("trailing input in '{input}'"));
    }
    if !value.is_finite() {
        return Err(format!("'{input}' is not finite"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BTreeMap<String, f64> {
        let mut p = BTreeMap::new();
        p.insert("l".to_string(), 200.0);
        p.insert("hole_d".to_string(), 10.0);
        p
    }

    #[test]
    fn precedence_and_parentheses() {
        let p = params();
        assert_eq!(evaluate("1 + 2 * 3", &p).unwrap(), 7.0);
        assert_eq!(evaluate("(1 + 2) * 3", &p).unwrap(), 9.0);
        assert_eq!(evaluate("-l / 2", &p).unwrap(), -100.0);
        assert_eq!(evaluate("hole_d / 2.", &p).unwrap(), 5.0);
        assert_eq!(evaluate("1e2 - -1", &p).unwrap(), 101.0);
    }

    #[test]
    fn errors() {
        let p = params();
        assert!(evaluate("w * 2", &p).unwrap_err().contains("undefined"));
        assert!(evaluate("(1 + 2", &p).is_err());
        assert!(evaluate("1 2", &p).unwrap_err().contains("trailing"));
        assert!(evaluate("1 / 0", &p).unwrap_err().contains("finite"));
        assert!(evaluate("2 ^ 3", &p).is_err());
        assert!(evaluate("", &p).is_err());
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let p = params();
        let signs = format!("{}1", "-".repeat(200_000));
        assert_eq!(evaluate(&signs, &p).unwrap_err(), "expression nested too deeply");
        let parens = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
        assert_eq!(evaluate(&parens, &p).unwrap_err(), "expression nested too deeply");
        let shallow = format!("{}l{}", "(".repeat(20), ")".repeat(20));
        assert_eq!(evaluate(&shallow, &p).unwrap(), 200.0);
        assert_eq!(evaluate("- - -1", &p).unwrap(), -1.0);
    }
}
