//! Restricted grammar for user-typed functions of one variable.
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := unary (('*' | '/') unary)*
//! unary      := ('+' | '-') unary | power
//! power      := primary (('**' | '^') unary)?
//! primary    := number | '(' expression ')' | function '(' expression ')' | constant | variable
//! function   := sin | cos | tan | exp | log | sqrt | abs
//! constant   := pi | e
//! ```
//!
//! Every identifier is checked against the allow-list while parsing; anything else is a
//! hard failure, never a fallback. The parser only ever builds an `Expr` tree, the text is
//! not executed in any way.
use crate::symbolic::symbolic_engine::Expr;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, multispace0, one_of},
    combinator::{cut, opt, recognize},
    error::{ErrorKind, ParseError},
    multi::{many0, many0_count},
    number::complete::recognize_float,
    sequence::{delimited, pair, preceded},
};
use std::f64::consts::{E, PI};
use std::fmt;

/// Functions the grammar accepts, each with exactly one argument.
pub const ALLOWED_FUNCTIONS: [&str; 7] = ["sin", "cos", "tan", "exp", "log", "sqrt", "abs"];
/// Named constants the grammar accepts.
pub const ALLOWED_CONSTANTS: [&str; 2] = ["pi", "e"];
/// Longest source accepted, in bytes.
pub const MAX_SOURCE_LEN: usize = 1024;
/// Deepest parenthesis nesting accepted.
pub const MAX_NESTING: usize = 64;
/// Deepest expression tree accepted after parsing.
pub const MAX_TREE_DEPTH: usize = 128;

/// Why a source string was not accepted as an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidExpression {
    /// Nothing but whitespace
    Empty,
    TooLong { len: usize, max: usize },
    TooDeep { depth: usize, max: usize },
    Syntax { position: usize, message: String },
    /// An identifier outside the allow-list
    DisallowedIdentifier { name: String, position: usize },
    /// The validation probe produced NaN or an infinity
    NonFinite { at: f64 },
}

impl fmt::Display for InvalidExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InvalidExpression::Empty => write!(f, "Expression is empty"),
            InvalidExpression::TooLong { len, max } => {
                write!(f, "Expression is too long ({} characters, at most {})", len, max)
            }
            InvalidExpression::TooDeep { depth, max } => {
                write!(f, "Expression is nested too deeply ({} levels, at most {})", depth, max)
            }
            InvalidExpression::Syntax { position, message } => {
                write!(f, "Syntax error at position {}: {}", position, message)
            }
            InvalidExpression::DisallowedIdentifier { name, position } => write!(
                f,
                "Identifier '{}' at position {} is not allowed (allowed: {}, {}, variable)",
                name,
                position,
                ALLOWED_FUNCTIONS.join(", "),
                ALLOWED_CONSTANTS.join(", ")
            ),
            InvalidExpression::NonFinite { at } => {
                write!(f, "Function is not finite at x = {}", at)
            }
        }
    }
}

impl std::error::Error for InvalidExpression {}

/// True for names that may not be used as the free variable.
pub fn is_reserved(name: &str) -> bool {
    ALLOWED_FUNCTIONS.contains(&name) || ALLOWED_CONSTANTS.contains(&name)
}

#[derive(Debug, Clone, PartialEq)]
enum GrammarErrorKind {
    Nom(ErrorKind),
    Expected(char),
    DisallowedIdentifier(String),
    MissingArgument(String),
    BadNumber,
}

/// nom error carrying the remaining input, so the position can be recovered.
#[derive(Debug, Clone, PartialEq)]
struct GrammarError<'a> {
    input: &'a str,
    kind: GrammarErrorKind,
}

impl<'a> ParseError<&'a str> for GrammarError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        GrammarError {
            input,
            kind: GrammarErrorKind::Nom(kind),
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }

    fn from_char(input: &'a str, c: char) -> Self {
        GrammarError {
            input,
            kind: GrammarErrorKind::Expected(c),
        }
    }

    // keep whichever branch got further into the input
    fn or(self, other: Self) -> Self {
        if other.input.len() <= self.input.len() {
            other
        } else {
            self
        }
    }
}

type PResult<'a, O> = IResult<&'a str, O, GrammarError<'a>>;

fn ws<'a, P>(inner: P) -> impl Parser<&'a str, Output = P::Output, Error = GrammarError<'a>>
where
    P: Parser<&'a str, Error = GrammarError<'a>>,
{
    delimited(multispace0, inner, multispace0)
}

fn build_call(name: &str, argument: Expr) -> Option<Expr> {
    let argument = Box::new(argument);
    let call = match name {
        "sin" => Expr::sin(argument),
        "cos" => Expr::cos(argument),
        "tan" => Expr::tg(argument),
        "exp" => Expr::Exp(argument),
        "log" => Expr::Ln(argument),
        "sqrt" => Expr::Sqrt(argument),
        "abs" => Expr::Abs(argument),
        _ => return None,
    };
    Some(call)
}

struct Grammar<'v> {
    variable: &'v str,
}

impl<'v> Grammar<'v> {
    fn expression<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        let (input, first) = self.term(input)?;
        let (input, rest) =
            many0(pair(ws(one_of("+-")), cut(|i: &'a str| self.term(i)))).parse(input)?;
        let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            '+' => acc + rhs,
            _ => acc - rhs,
        });
        Ok((input, expr))
    }

    fn term<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        let (input, first) = self.unary(input)?;
        let (input, rest) =
            many0(pair(ws(one_of("*/")), cut(|i: &'a str| self.unary(i)))).parse(input)?;
        let expr = rest.into_iter().fold(first, |acc, (op, rhs)| match op {
            '*' => acc * rhs,
            _ => acc / rhs,
        });
        Ok((input, expr))
    }

    fn unary<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        let (rest, sign) = opt(ws(one_of("+-"))).parse(input)?;
        match sign {
            Some('-') => {
                let (rest, operand) = cut(|i: &'a str| self.unary(i)).parse(rest)?;
                Ok((rest, -operand))
            }
            Some(_) => cut(|i: &'a str| self.unary(i)).parse(rest),
            None => self.power(input),
        }
    }

    // right-associative, and tighter than a unary minus on its left: -x**2 == -(x**2)
    fn power<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        let (input, base) = self.primary(input)?;
        let (input, exponent) = opt(preceded(
            ws(alt((tag("**"), tag("^")))),
            cut(|i: &'a str| self.unary(i)),
        ))
        .parse(input)?;
        let expr = match exponent {
            Some(exponent) => base.pow(exponent),
            None => base,
        };
        Ok((input, expr))
    }

    fn primary<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        ws(alt((
            |i: &'a str| self.number(i),
            |i: &'a str| self.parenthesized(i),
            |i: &'a str| self.identifier(i),
        )))
        .parse(input)
    }

    fn number<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        let (rest, literal) = recognize_float(input)?;
        match literal.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok((rest, Expr::Const(value))),
            _ => Err(nom::Err::Failure(GrammarError {
                input,
                kind: GrammarErrorKind::BadNumber,
            })),
        }
    }

    fn parenthesized<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        delimited(
            char('('),
            cut(|i: &'a str| self.expression(i)),
            cut(ws(char(')'))),
        )
        .parse(input)
    }

    fn identifier<'a>(&self, input: &'a str) -> PResult<'a, Expr> {
        let (rest, name) = recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_")))),
        ))
        .parse(input)?;

        if ALLOWED_FUNCTIONS.contains(&name) {
            let (rest, _) = ws(char('(')).parse(rest).map_err(|_| {
                nom::Err::Failure(GrammarError {
                    input: rest,
                    kind: GrammarErrorKind::MissingArgument(name.to_string()),
                })
            })?;
            let (rest, argument) = cut(|i: &'a str| self.expression(i)).parse(rest)?;
            let (rest, _) = cut(ws(char(')'))).parse(rest)?;
            return match build_call(name, argument) {
                Some(call) => Ok((rest, call)),
                None => Err(nom::Err::Failure(GrammarError {
                    input,
                    kind: GrammarErrorKind::DisallowedIdentifier(name.to_string()),
                })),
            };
        }
        match name {
            "pi" => Ok((rest, Expr::Const(PI))),
            "e" => Ok((rest, Expr::Const(E))),
            _ if name == self.variable => Ok((rest, Expr::Var(name.to_string()))),
            _ => Err(nom::Err::Failure(GrammarError {
                input,
                kind: GrammarErrorKind::DisallowedIdentifier(name.to_string()),
            })),
        }
    }
}

fn nesting_depth(input: &str) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    for c in input.chars() {
        match c {
            '(' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max_depth
}

fn describe_remaining(rest: &str) -> String {
    match rest.chars().next() {
        Some(c) => format!("unexpected character '{}'", c),
        None => "unexpected end of input".to_string(),
    }
}

fn into_invalid(error: GrammarError, source: &str) -> InvalidExpression {
    let position = source.len() - error.input.len();
    match error.kind {
        GrammarErrorKind::DisallowedIdentifier(name) => {
            InvalidExpression::DisallowedIdentifier { name, position }
        }
        GrammarErrorKind::MissingArgument(name) => InvalidExpression::Syntax {
            position,
            message: format!("function '{}' must be called with parentheses", name),
        },
        GrammarErrorKind::BadNumber => InvalidExpression::Syntax {
            position,
            message: "malformed number".to_string(),
        },
        GrammarErrorKind::Expected(c) if error.input.is_empty() => InvalidExpression::Syntax {
            position,
            message: format!("unexpected end of input, expected '{}'", c),
        },
        GrammarErrorKind::Expected(c) => InvalidExpression::Syntax {
            position,
            message: format!("expected '{}', {}", c, describe_remaining(error.input)),
        },
        GrammarErrorKind::Nom(_) => InvalidExpression::Syntax {
            position,
            message: describe_remaining(error.input),
        },
    }
}

/// Parses `input` against the restricted grammar with `variable` as the only free variable.
///
/// Positions in the returned error are byte offsets into `input`.
///
/// # Example
/// ```
/// use riemann_explorer::symbolic::parse_expr::parse_expression_func;
/// let expr = parse_expression_func("x**2 + sin(x)", "x").unwrap();
/// assert_eq!(expr.to_string(), "((x ^ 2) + sin(x))");
/// ```
pub fn parse_expression_func(input: &str, variable: &str) -> Result<Expr, InvalidExpression> {
    if input.trim().is_empty() {
        return Err(InvalidExpression::Empty);
    }
    if input.len() > MAX_SOURCE_LEN {
        return Err(InvalidExpression::TooLong {
            len: input.len(),
            max: MAX_SOURCE_LEN,
        });
    }
    let depth = nesting_depth(input);
    if depth > MAX_NESTING {
        return Err(InvalidExpression::TooDeep {
            depth,
            max: MAX_NESTING,
        });
    }

    let grammar = Grammar { variable };
    let expr = match grammar.expression(input) {
        Ok(("", expr)) => expr,
        Ok((rest, _)) => {
            return Err(InvalidExpression::Syntax {
                position: input.len() - rest.len(),
                message: describe_remaining(rest),
            });
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => return Err(into_invalid(e, input)),
        Err(nom::Err::Incomplete(_)) => {
            return Err(InvalidExpression::Syntax {
                position: input.len(),
                message: "unexpected end of input".to_string(),
            });
        }
    };

    let tree_depth = expr.depth();
    if tree_depth > MAX_TREE_DEPTH {
        return Err(InvalidExpression::TooDeep {
            depth: tree_depth,
            max: MAX_TREE_DEPTH,
        });
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::Var("x".to_string())
    }

    fn parse(input: &str) -> Result<Expr, InvalidExpression> {
        parse_expression_func(input, "x")
    }

    #[test]
    fn test_parse_constant() {
        assert_eq!(parse("42").unwrap(), Expr::Const(42.0));
        assert_eq!(parse("1.5e2").unwrap(), Expr::Const(150.0));
        assert_eq!(parse(".5").unwrap(), Expr::Const(0.5));
    }

    #[test]
    fn test_parse_variable() {
        assert_eq!(parse("x").unwrap(), x());
        assert_eq!(parse("  x  ").unwrap(), x());
    }

    #[test]
    fn test_parse_named_constants() {
        assert_eq!(parse("pi").unwrap(), Expr::Const(PI));
        assert_eq!(parse("e").unwrap(), Expr::Const(E));
    }

    #[test]
    fn test_parse_addition_is_left_associative() {
        let expected = (x() - Expr::Const(2.0)) + Expr::Const(1.0);
        assert_eq!(parse("x - 2 + 1").unwrap(), expected);
    }

    #[test]
    fn test_parse_precedence() {
        let expected = x() + Expr::Const(2.0) * x();
        assert_eq!(parse("x + 2*x").unwrap(), expected);
        let expected = (x() + Expr::Const(2.0)) * x();
        assert_eq!(parse("(x + 2)*x").unwrap(), expected);
    }

    #[test]
    fn test_parse_division_is_left_associative() {
        let expected = (x() / Expr::Const(2.0)) / Expr::Const(4.0);
        assert_eq!(parse("x / 2 / 4").unwrap(), expected);
    }

    #[test]
    fn test_parse_power_both_spellings() {
        let expected = x().pow(Expr::Const(2.0));
        assert_eq!(parse("x**2").unwrap(), expected);
        assert_eq!(parse("x ^ 2").unwrap(), expected);
    }

    #[test]
    fn test_parse_power_is_right_associative() {
        let expected = Expr::Const(2.0).pow(Expr::Const(3.0).pow(Expr::Const(2.0)));
        assert_eq!(parse("2**3**2").unwrap(), expected);
    }

    #[test]
    fn test_unary_minus_binds_looser_than_power() {
        let expected = -(x().pow(Expr::Const(2.0)));
        assert_eq!(parse("-x**2").unwrap(), expected);
        assert_eq!(parse("-3").unwrap(), Expr::Const(-3.0));
        assert_eq!(parse("x**-1").unwrap(), x().pow(Expr::Const(-1.0)));
        assert_eq!(parse("+x").unwrap(), x());
    }

    #[test]
    fn test_parse_functions() {
        assert_eq!(parse("sin(x)").unwrap(), Expr::sin(Box::new(x())));
        assert_eq!(parse("cos(x)").unwrap(), Expr::cos(Box::new(x())));
        assert_eq!(parse("tan(x)").unwrap(), Expr::tg(Box::new(x())));
        assert_eq!(parse("exp(x)").unwrap(), Expr::Exp(Box::new(x())));
        assert_eq!(parse("log(x)").unwrap(), Expr::Ln(Box::new(x())));
        assert_eq!(parse("sqrt(x)").unwrap(), Expr::Sqrt(Box::new(x())));
        assert_eq!(parse("abs (x)").unwrap(), Expr::Abs(Box::new(x())));
    }

    #[test]
    fn test_parse_nested_functions() {
        assert_eq!(
            parse("sin(cos(x))").unwrap(),
            Expr::sin(Box::new(Expr::cos(Box::new(x()))))
        );
    }

    #[test]
    fn test_parse_complex_expression() {
        let expected = Expr::Exp(Box::new(-(x().pow(Expr::Const(2.0))) / Expr::Const(4.0)));
        assert_eq!(parse("exp(-x**2/4)").unwrap(), expected);
    }

    #[test]
    fn test_custom_variable_name() {
        let expr = parse_expression_func("t*2", "t").unwrap();
        assert_eq!(expr, Expr::Var("t".to_string()) * Expr::Const(2.0));
        assert!(matches!(
            parse_expression_func("x*2", "t"),
            Err(InvalidExpression::DisallowedIdentifier { .. })
        ));
    }

    #[test]
    fn test_disallowed_identifiers() {
        for source in ["y", "x + y", "sinh(x)", "ln(x)", "inf", "nan", "__import__", "tg(x)"] {
            assert!(
                matches!(
                    parse(source),
                    Err(InvalidExpression::DisallowedIdentifier { .. })
                ),
                "{} should be rejected as a disallowed identifier",
                source
            );
        }
    }

    #[test]
    fn test_disallowed_identifier_reports_name_and_position() {
        let err = parse("x + np.sin(x)").unwrap_err();
        assert_eq!(
            err,
            InvalidExpression::DisallowedIdentifier {
                name: "np".to_string(),
                position: 4
            }
        );
    }

    #[test]
    fn test_attribute_and_assignment_syntax_rejected() {
        for source in ["x.real", "x = 1", "x; x", "x[0]", "{x}", "x, x", "lambda: x"] {
            assert!(parse(source).is_err(), "{} should be rejected", source);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Err(InvalidExpression::Empty));
        assert_eq!(parse("   \t"), Err(InvalidExpression::Empty));
    }

    #[test]
    fn test_invalid_expression() {
        assert!(parse("(x +").is_err());
        assert!(parse("x +").is_err());
        assert!(parse("x * * 2").is_err());
        assert!(parse("2x").is_err());
        assert!(parse("sin x").is_err());
        assert!(parse("log(x, 2)").is_err());
        assert!(parse("()").is_err());
    }

    #[test]
    fn test_unmatched_brackets() {
        let err = parse("(x + 1").unwrap_err();
        assert!(matches!(err, InvalidExpression::Syntax { .. }));
        assert!(parse("x + 1)").is_err());
    }

    #[test]
    fn test_function_without_parentheses() {
        let err = parse("sin").unwrap_err();
        assert!(matches!(err, InvalidExpression::Syntax { ref message, .. } if message.contains("sin")));
    }

    #[test]
    fn test_length_and_nesting_limits() {
        let long = "x+".repeat(MAX_SOURCE_LEN) + "x";
        assert!(matches!(parse(&long), Err(InvalidExpression::TooLong { .. })));
        let deep = format!("{}x{}", "(".repeat(MAX_NESTING + 1), ")".repeat(MAX_NESTING + 1));
        assert!(matches!(parse(&deep), Err(InvalidExpression::TooDeep { .. })));
        let ok = format!("{}x{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse(&ok).unwrap(), x());
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        for source in ["x**2 - 3*x + 1", "exp(-x**2/4)", "abs(x) / (1 + x^2)", "-sin(2*x)"] {
            let expr = parse(source).unwrap();
            let reparsed = parse(&expr.to_string()).unwrap();
            assert_eq!(expr, reparsed, "{}", source);
        }
    }
}
