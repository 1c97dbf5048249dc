use std::fmt;

use logos::Logos;

use crate::error::SyntaxError;

#[derive(Logos, Debug, PartialEq, Eq, Clone, Copy)]
enum LogosToken {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(",")]
    Comma,

    #[token("#")]
    Hash,

    #[token("[")]
    LBracket,

    #[token("]")]
    RBracket,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("**")]
    Pow,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("::")]
    Cons,

    #[token("<=")]
    Le,

    #[token("<")]
    Lt,

    #[token("==")]
    Eq,

    #[token("<>")]
    Ne,

    #[token(">=")]
    Ge,

    #[token(">")]
    Gt,

    #[token("=")]
    Assign,

    #[token(";")]
    Semicolon,

    //keywords
    #[token("mod")]
    Mod,

    #[token("div")]
    Div,

    #[token("in")]
    In,

    #[token("not")]
    Not,

    #[token("andalso")]
    AndAlso,

    #[token("orelse")]
    OrElse,

    #[token("True")]
    True,

    #[token("False")]
    False,

    #[token("print")]
    Print,

    #[token("if")]
    If,

    #[token("else")]
    Else,

    #[token("while")]
    While,

    #[token("fun")]
    Fun,

    // a decimal point is what makes a real; an optional `e`/`e-` exponent may follow
    #[regex(r"\.[0-9]+")]
    #[regex(r"\.[0-9]*e-?[0-9]+")]
    #[regex(r"[0-9]+\.[0-9]*(e-?)?[0-9]*")]
    Real,

    #[regex(r"[0-9]+")]
    Integer,

    #[regex(r#""[^"]*"|'[^']*'"#)]
    StringLiteral,

    #[regex(r"[a-zA-Z][a-zA-Z0-9_]*")]
    Identifier,

    #[error]
    #[regex(r"[ \t\r\n]+", logos::skip)]
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    LParen,
    RParen,
    Comma,
    Hash,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pow,
    Star,
    Slash,
    Plus,
    Minus,
    Cons,
    Le,
    Lt,
    Eq,
    Ne,
    Ge,
    Gt,
    Assign,
    Semicolon,
    Mod,
    Div,
    In,
    Not,
    AndAlso,
    OrElse,
    True,
    False,
    Print,
    If,
    Else,
    While,
    Fun,
    Integer(i64),
    Real(f64),
    StringLiteral(&'a str),
    Identifier(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Hash => "#",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Pow => "**",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Cons => "::",
            Token::Le => "<=",
            Token::Lt => "<",
            Token::Eq => "==",
            Token::Ne => "<>",
            Token::Ge => ">=",
            Token::Gt => ">",
            Token::Assign => "=",
            Token::Semicolon => ";",
            Token::Mod => "mod",
            Token::Div => "div",
            Token::In => "in",
            Token::Not => "not",
            Token::AndAlso => "andalso",
            Token::OrElse => "orelse",
            Token::True => "True",
            Token::False => "False",
            Token::Print => "print",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::Fun => "fun",
            Token::Integer(n) => return write!(f, "integer {n}"),
            Token::Real(n) => return write!(f, "real {n}"),
            Token::StringLiteral(s) => return write!(f, "string {s:?}"),
            Token::Identifier(name) => return write!(f, "identifier `{name}`"),
        };
        write!(f, "`{text}`")
    }
}

/// A token together with the line it starts on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spanned<'a> {
    pub token: Token<'a>,
    pub line: usize,
}

/// Splits `text` into tokens. The first character that starts no token
/// fails the whole call.
pub fn lex(text: &str) -> Result<Vec<Spanned<'_>>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut iter = LogosToken::lexer(text);
    let mut line = 1;
    let mut counted_to = 0;

    while let Some(token) = iter.next() {
        let span = iter.span();
        line += text[counted_to..span.start].matches('\n').count();
        counted_to = span.start;

        let slice = iter.slice();
        let token = match token {
            LogosToken::LParen => Token::LParen,
            LogosToken::RParen => Token::RParen,
            LogosToken::Comma => Token::Comma,
            LogosToken::Hash => Token::Hash,
            LogosToken::LBracket => Token::LBracket,
            LogosToken::RBracket => Token::RBracket,
            LogosToken::LBrace => Token::LBrace,
            LogosToken::RBrace => Token::RBrace,
            LogosToken::Pow => Token::Pow,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Cons => Token::Cons,
            LogosToken::Le => Token::Le,
            LogosToken::Lt => Token::Lt,
            LogosToken::Eq => Token::Eq,
            LogosToken::Ne => Token::Ne,
            LogosToken::Ge => Token::Ge,
            LogosToken::Gt => Token::Gt,
            LogosToken::Assign => Token::Assign,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Mod => Token::Mod,
            LogosToken::Div => Token::Div,
            LogosToken::In => Token::In,
            LogosToken::Not => Token::Not,
            LogosToken::AndAlso => Token::AndAlso,
            LogosToken::OrElse => Token::OrElse,
            LogosToken::True => Token::True,
            LogosToken::False => Token::False,
            LogosToken::Print => Token::Print,
            LogosToken::If => Token::If,
            LogosToken::Else => Token::Else,
            LogosToken::While => Token::While,
            LogosToken::Fun => Token::Fun,
            LogosToken::Real => Token::Real(parse_literal(slice, line)?),
            LogosToken::Integer => Token::Integer(parse_literal(slice, line)?),
            LogosToken::StringLiteral => Token::StringLiteral(&slice[1..(slice.len() - 1)]),
            LogosToken::Identifier => Token::Identifier(slice),
            LogosToken::Error => {
                return Err(SyntaxError::UnrecognizedInput {
                    text: slice.to_string(),
                    line,
                })
            }
        };
        tokens.push(Spanned { token, line });
    }

    tracing::trace!(count = tokens.len(), lines = line, "tokenized source");
    Ok(tokens)
}

fn parse_literal<T: std::str::FromStr>(slice: &str, line: usize) -> Result<T, SyntaxError> {
    slice.parse().map_err(|_| SyntaxError::InvalidLiteral {
        text: slice.to_string(),
        line,
    })
}
