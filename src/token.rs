//! Token definitions. Mirrors `tokens.h`'s single-character operators and
//! named multi-character/keyword constants, but as a real Rust enum instead
//! of ASCII-valued ints, since the lexer is implemented in this crate
//! rather than handed to us by an external collaborator.

use std::fmt;
use std::rc::Rc;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Keyword {
  Auto, Break, Case, Char, Const, Continue, Default, Do, Double,
  Else, Enum, Extern, Float, For, Goto, If, Int, Long, Register,
  Return, Short, Signed, Sizeof, Static, Struct, Switch, Typedef,
  Union, Unsigned, Void, Volatile, While,
}

impl Keyword {
  #[must_use] pub fn from_str(s: &str) -> Option<Self> {
    use Keyword::*;
    Some(match s {
      "auto" => Auto, "break" => Break, "case" => Case, "char" => Char,
      "const" => Const, "continue" => Continue, "default" => Default,
      "do" => Do, "double" => Double, "else" => Else, "enum" => Enum,
      "extern" => Extern, "float" => Float, "for" => For, "goto" => Goto,
      "if" => If, "int" => Int, "long" => Long, "register" => Register,
      "return" => Return, "short" => Short, "signed" => Signed,
      "sizeof" => Sizeof, "static" => Static, "struct" => Struct,
      "switch" => Switch, "typedef" => Typedef, "union" => Union,
      "unsigned" => Unsigned, "void" => Void, "volatile" => Volatile,
      "while" => While,
      _ => return None,
    })
  }
}

/// A lexical token. `Done` is yielded once at end of input (and forever
/// after, like `yylex()` returning 0 past EOF).
#[derive(Clone, PartialEq, Debug)]
pub enum Token {
  Keyword(Keyword),
  Id(Rc<str>),
  Num(u64),
  Character(u8),
  String(Rc<str>),
  /// `||`, `&&`, `==`, `!=`, `<=`, `>=`
  Or, And, Eql, Neq, Leq, Geq,
  /// Single-character operators and punctuation.
  Punct(char),
  /// An unrecognized character. Carries its own lexeme so the parser's
  /// catch-all error path can report it the same way it reports a
  /// misplaced valid token.
  Error(Rc<str>),
  Done,
}

impl Token {
  /// The lexeme text as the parser's diagnostics want to print it.
  #[must_use] pub fn lexeme(&self) -> String {
    match self {
      Token::Keyword(k) => format!("{k:?}").to_lowercase(),
      Token::Id(s) | Token::String(s) | Token::Error(s) => s.to_string(),
      Token::Num(n) => n.to_string(),
      Token::Character(c) => (*c as char).to_string(),
      Token::Or => "||".into(),
      Token::And => "&&".into(),
      Token::Eql => "==".into(),
      Token::Neq => "!=".into(),
      Token::Leq => "<=".into(),
      Token::Geq => ">=".into(),
      Token::Punct(c) => c.to_string(),
      Token::Done => String::new(),
    }
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.lexeme())
  }
}
