// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use policies::unstable::*;
use policies::SyntaxError;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
struct Case {
    note: String,
    rule: String,
    #[serde(default)]
    tokens: Vec<String>,
    #[serde(default)]
    kinds: Vec<String>,
    #[serde(default)]
    positions: Vec<(u32, u32)>,
    error: Option<String>,
    error_at: Option<(u32, u32)>,
}

#[derive(Serialize, Deserialize, Debug)]
struct Test {
    cases: Vec<Case>,
}

fn get_tokens(source: &Source) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut lex = Lexer::new(source);
    loop {
        let tok = lex.next_token()?;
        let done = tok.0 == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    Ok(tokens)
}

fn check_error(case: &Case, err: anyhow::Error) -> Result<()> {
    let Some(expected) = &case.error else {
        return Err(err);
    };
    let msg = err.to_string();
    if !msg.contains(expected.as_str()) {
        bail!("`{msg}` does not contain `{expected}`");
    }
    if let Some((line, col)) = case.error_at {
        let Some(syntax) = err.downcast_ref::<SyntaxError>() else {
            bail!("not a syntax error: {msg}");
        };
        assert_eq!((syntax.line, syntax.col), (line, col), "{msg}");
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: Test = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("case {} ", case.note);
        let source = Source::from_contents("test".to_string(), case.rule.clone())?;
        match get_tokens(&source) {
            Ok(tokens) => {
                if case.error.is_some() {
                    bail!("expected error in case {}", case.note);
                }
                if !case.tokens.is_empty() {
                    let texts: Vec<&str> = tokens.iter().map(|t| t.1.text()).collect();
                    assert_eq!(texts, case.tokens, "case {}", case.note);
                }
                if !case.kinds.is_empty() {
                    let kinds: Vec<String> = tokens.iter().map(|t| format!("{:?}", t.0)).collect();
                    assert_eq!(kinds, case.kinds, "case {}", case.note);
                }
                if !case.positions.is_empty() {
                    let positions: Vec<(u32, u32)> =
                        tokens.iter().map(|t| (t.1.line, t.1.col)).collect();
                    assert_eq!(positions, case.positions, "case {}", case.note);
                }
            }
            Err(err) => check_error(case, err)?,
        }
        println!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/lexer/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn unescape_decodes_string_tokens() -> Result<()> {
    assert_eq!(unescape(r"tab\there").as_deref(), Ok("tab\there"));
    assert_eq!(unescape(r"é\U0001F600").as_deref(), Ok("é😀"));
    assert_eq!(unescape(r#"\"quoted\""#).as_deref(), Ok("\"quoted\""));
    assert!(unescape(r"\UFFFFFFFF").is_err());
    Ok(())
}

#[test]
fn syntax_error_renders_caret() -> Result<()> {
    let source = Source::from_contents("greeting".to_string(), "name == 'bob".to_string())?;
    let err = match get_tokens(&source) {
        Ok(_) => bail!("expected an error"),
        Err(e) => e,
    };
    let msg = err.to_string();
    assert!(msg.contains("--> greeting:1:9"), "{msg}");
    assert!(msg.contains("| name == 'bob"), "{msg}");
    assert!(msg.contains("error: unterminated string literal"), "{msg}");
    Ok(())
}
