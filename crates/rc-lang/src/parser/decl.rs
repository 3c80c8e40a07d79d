//! Declaration and type-spec parsers (keyword dispatched).

use super::expr::parse_expr;
use super::stmt::{parse_block, parse_const};
use super::{ParseError, TokenStream};
use crate::ast::{
    ActionDecl, BindDecl, Decl, FieldDecl, FunctionDecl, GetterDecl, InitializerDecl, InstanceDecl,
    MethodDecl, MutabilityMod, ParamDecl, ReactionDecl, Receiver, TypeDecl, TypeSpec,
};
use crate::lexer::Token;

/// Parse a whole file of declarations.
pub fn parse_program(stream: &mut TokenStream) -> Result<Vec<Decl>, Vec<ParseError>> {
    let mut decls = Vec::new();
    let mut errors = Vec::new();

    while !stream.at_end() {
        match parse_decl(stream) {
            Ok(decl) => decls.push(decl),
            Err(e) => {
                errors.push(e);
                recover_to_decl(stream);
            }
        }
    }

    if errors.is_empty() {
        Ok(decls)
    } else {
        Err(errors)
    }
}

/// Skip tokens until the next plausible declaration keyword.
fn recover_to_decl(stream: &mut TokenStream) {
    let mut depth = 0usize;
    while let Some(token) = stream.peek() {
        match token {
            Token::LBrace => depth += 1,
            Token::RBrace => depth = depth.saturating_sub(1),
            Token::Type
            | Token::Const
            | Token::Func
            | Token::Init
            | Token::Getter
            | Token::Action
            | Token::Reaction
            | Token::Bind
            | Token::Instance
                if depth == 0 =>
            {
                return;
            }
            _ => {}
        }
        stream.advance();
    }
}

fn parse_decl(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    match stream.peek() {
        Some(Token::Type) => parse_type_decl(stream),
        Some(Token::Const) => Ok(Decl::Const(parse_const(stream)?)),
        Some(Token::Func) => parse_func(stream),
        Some(Token::Init) => parse_init(stream),
        Some(Token::Getter) => parse_getter(stream),
        Some(Token::Action) => parse_action(stream),
        Some(Token::Reaction) => parse_reaction(stream),
        Some(Token::Bind) => parse_bind(stream),
        Some(Token::Instance) => parse_instance(stream),
        other => Err(ParseError::unexpected_token(
            other,
            "at top level",
            stream.current_span(),
        )),
    }
}

/// `type Name <spec>`
fn parse_type_decl(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Type)?;
    let (name, _) = stream.expect_identifier("in type declaration")?;
    let spec = parse_type_spec(stream)?;
    stream.eat(&Token::Semicolon);
    Ok(Decl::Type(TypeDecl {
        name,
        spec,
        span: stream.span_from(start),
    }))
}

/// `func name(params) [ret] { body }` or `func (recv) name(params) [ret] { body }`
fn parse_func(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Func)?;

    if stream.check(&Token::LParen) {
        let receiver = parse_receiver(stream)?;
        let (name, _) = stream.expect_identifier("in method declaration")?;
        let params = parse_params(stream)?;
        let ret = parse_optional_return(stream)?;
        let body = parse_block(stream)?;
        return Ok(Decl::Method(MethodDecl {
            receiver,
            name,
            params,
            ret,
            body,
            span: stream.span_from(start),
        }));
    }

    let (name, _) = stream.expect_identifier("in function declaration")?;
    let params = parse_params(stream)?;
    let ret = parse_optional_return(stream)?;
    let body = parse_block(stream)?;
    Ok(Decl::Function(FunctionDecl {
        name,
        params,
        ret,
        body,
        span: stream.span_from(start),
    }))
}

/// `init (recv) name(params) { body }`
fn parse_init(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Init)?;
    let receiver = parse_receiver(stream)?;
    let (name, _) = stream.expect_identifier("in init declaration")?;
    let params = parse_params(stream)?;
    let body = parse_block(stream)?;
    Ok(Decl::Initializer(InitializerDecl {
        receiver,
        name,
        params,
        body,
        span: stream.span_from(start),
    }))
}

/// `getter (recv) name(params) T { body }`
fn parse_getter(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Getter)?;
    let receiver = parse_receiver(stream)?;
    let (name, _) = stream.expect_identifier("in getter declaration")?;
    let params = parse_params(stream)?;
    let ret = parse_type_spec(stream)?;
    let body = parse_block(stream)?;
    Ok(Decl::Getter(GetterDecl {
        receiver,
        name,
        params,
        ret,
        body,
        span: stream.span_from(start),
    }))
}

/// `action [dim] (recv) (precondition) { body }`
fn parse_action(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Action)?;
    let dimension = parse_optional_dimension(stream)?;
    let receiver = parse_receiver(stream)?;
    stream.expect(Token::LParen)?;
    let precondition = parse_expr(stream)?;
    stream.expect(Token::RParen)?;
    let body = parse_block(stream)?;
    Ok(Decl::Action(ActionDecl {
        dimension,
        receiver,
        precondition,
        body,
        span: stream.span_from(start),
    }))
}

/// `reaction [dim] (recv) name(params) { body }`
fn parse_reaction(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Reaction)?;
    let dimension = parse_optional_dimension(stream)?;
    let receiver = parse_receiver(stream)?;
    let (name, _) = stream.expect_identifier("in reaction declaration")?;
    let params = parse_params(stream)?;
    let body = parse_block(stream)?;
    Ok(Decl::Reaction(ReactionDecl {
        dimension,
        receiver,
        name,
        params,
        body,
        span: stream.span_from(start),
    }))
}

/// `bind (recv) { body }`
fn parse_bind(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Bind)?;
    let receiver = parse_receiver(stream)?;
    let body = parse_block(stream)?;
    Ok(Decl::Bind(BindDecl {
        receiver,
        body,
        span: stream.span_from(start),
    }))
}

/// `instance name Component initializer(args)`
fn parse_instance(stream: &mut TokenStream) -> Result<Decl, ParseError> {
    let start = stream.mark();
    stream.expect(Token::Instance)?;
    let (name, _) = stream.expect_identifier("in instance declaration")?;
    let (type_name, _) = stream.expect_identifier("in instance declaration")?;
    let (initializer, _) = stream.expect_identifier("in instance declaration")?;
    let args = super::expr::parse_call_args(stream)?;
    stream.eat(&Token::Semicolon);
    Ok(Decl::Instance(InstanceDecl {
        name,
        type_name,
        initializer,
        args,
        span: stream.span_from(start),
    }))
}

/// `[N]` before the receiver of an action or reaction.
fn parse_optional_dimension(
    stream: &mut TokenStream,
) -> Result<Option<crate::ast::Expr>, ParseError> {
    if stream.eat(&Token::LBracket) {
        let dim = parse_expr(stream)?;
        stream.expect(Token::RBracket)?;
        Ok(Some(dim))
    } else {
        Ok(None)
    }
}

/// `(name *Component)`
fn parse_receiver(stream: &mut TokenStream) -> Result<Receiver, ParseError> {
    let start = stream.mark();
    stream.expect(Token::LParen)?;
    let (name, _) = stream.expect_identifier("in receiver")?;
    stream.expect(Token::Star)?;
    let (type_name, _) = stream.expect_identifier("in receiver")?;
    stream.expect(Token::RParen)?;
    Ok(Receiver {
        name,
        type_name,
        span: stream.span_from(start),
    })
}

/// `(p T, q const *T, ...)`
pub(super) fn parse_params(stream: &mut TokenStream) -> Result<Vec<ParamDecl>, ParseError> {
    stream.expect(Token::LParen)?;
    let mut params = Vec::new();
    while !stream.check(&Token::RParen) {
        let start = stream.mark();
        let (name, _) = stream.expect_identifier("in parameter list")?;
        let modifier = parse_modifier(stream);
        let spec = parse_type_spec(stream)?;
        params.push(ParamDecl {
            name,
            modifier,
            spec,
            span: stream.span_from(start),
        });
        if !stream.eat(&Token::Comma) {
            break;
        }
    }
    stream.expect(Token::RParen)?;
    Ok(params)
}

/// A return type is present when the next token can begin a type spec.
fn parse_optional_return(stream: &mut TokenStream) -> Result<Option<TypeSpec>, ParseError> {
    if starts_type_spec(stream) {
        Ok(Some(parse_type_spec(stream)?))
    } else {
        Ok(None)
    }
}

fn starts_type_spec(stream: &TokenStream) -> bool {
    matches!(
        stream.peek(),
        Some(
            Token::Ident(_)
                | Token::Star
                | Token::LBracket
                | Token::Heap
                | Token::Map
                | Token::Struct
                | Token::Component
                | Token::Push
                | Token::Pull
        )
    )
}

/// `const` / `foreign` indirection marker before a type.
pub(super) fn parse_modifier(stream: &mut TokenStream) -> MutabilityMod {
    if stream.eat(&Token::Const) {
        MutabilityMod::Const
    } else if stream.eat(&Token::Foreign) {
        MutabilityMod::Foreign
    } else {
        MutabilityMod::Default
    }
}

/// Parse a type spec.
pub(super) fn parse_type_spec(stream: &mut TokenStream) -> Result<TypeSpec, ParseError> {
    let start = stream.mark();
    match stream.peek() {
        Some(Token::Ident(_)) => {
            let (name, span) = stream.expect_identifier("in type")?;
            Ok(TypeSpec::Name(name, span))
        }
        Some(Token::Star) => {
            stream.advance();
            let base = parse_type_spec(stream)?;
            Ok(TypeSpec::Pointer(Box::new(base), stream.span_from(start)))
        }
        Some(Token::LBracket) => {
            stream.advance();
            if stream.eat(&Token::RBracket) {
                let base = parse_type_spec(stream)?;
                Ok(TypeSpec::Slice(Box::new(base), stream.span_from(start)))
            } else {
                let dim = parse_expr(stream)?;
                stream.expect(Token::RBracket)?;
                let base = parse_type_spec(stream)?;
                Ok(TypeSpec::Array(
                    Box::new(dim),
                    Box::new(base),
                    stream.span_from(start),
                ))
            }
        }
        Some(Token::Heap) => {
            stream.advance();
            let base = parse_type_spec(stream)?;
            Ok(TypeSpec::Heap(Box::new(base), stream.span_from(start)))
        }
        Some(Token::Map) => {
            stream.advance();
            stream.expect(Token::LBracket)?;
            let key = parse_type_spec(stream)?;
            stream.expect(Token::RBracket)?;
            let value = parse_type_spec(stream)?;
            Ok(TypeSpec::Map(
                Box::new(key),
                Box::new(value),
                stream.span_from(start),
            ))
        }
        Some(Token::Struct) => {
            stream.advance();
            let fields = parse_field_list(stream)?;
            Ok(TypeSpec::Struct(fields, stream.span_from(start)))
        }
        Some(Token::Component) => {
            stream.advance();
            let fields = parse_field_list(stream)?;
            Ok(TypeSpec::Component(fields, stream.span_from(start)))
        }
        Some(Token::Push) => {
            stream.advance();
            let params = parse_params(stream)?;
            Ok(TypeSpec::Push(params, stream.span_from(start)))
        }
        Some(Token::Pull) => {
            stream.advance();
            let params = parse_params(stream)?;
            let ret = if starts_type_spec(stream) {
                Some(Box::new(parse_type_spec(stream)?))
            } else {
                None
            };
            Ok(TypeSpec::Pull(params, ret, stream.span_from(start)))
        }
        other => Err(ParseError::unexpected_token(
            other,
            "in type",
            stream.current_span(),
        )),
    }
}

/// `{ name T ["tag"]; ... }`
fn parse_field_list(stream: &mut TokenStream) -> Result<Vec<FieldDecl>, ParseError> {
    stream.expect(Token::LBrace)?;
    let mut fields = Vec::new();
    while !stream.check(&Token::RBrace) {
        let start = stream.mark();
        let (name, _) = stream.expect_identifier("in field list")?;
        let spec = parse_type_spec(stream)?;
        let tag = match stream.peek() {
            Some(Token::Str(tag)) => {
                let tag = tag.clone();
                stream.advance();
                Some(tag)
            }
            _ => None,
        };
        fields.push(FieldDecl {
            name,
            spec,
            tag,
            span: stream.span_from(start),
        });
        if !stream.eat(&Token::Semicolon) {
            break;
        }
    }
    stream.expect(Token::RBrace)?;
    Ok(fields)
}
