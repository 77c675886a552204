//! Parse declaration source into AST using PEST.

use crate::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct DeclarationParser;

/// Parse declaration source into AST.
pub fn parse(source: &str) -> Result<SourceFile, String> {
    let pairs = DeclarationParser::parse(Rule::file, source)
        .map_err(|e| format!("Parse error: {}", e))?;
    let pair = pairs.into_iter().next().ok_or("Empty parse")?;
    build_file(pair)
}

fn build_file(pair: Pair<Rule>) -> Result<SourceFile, String> {
    let mut package = None;
    let mut declarations = Vec::new();

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::package_clause => {
                let name = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::ident)
                    .ok_or("package clause: missing name")?;
                if package.replace(name.as_str().to_string()).is_some() {
                    return Err("Duplicate package clause".to_string());
                }
            }
            Rule::declaration => declarations.push(build_declaration(inner)?),
            _ => {}
        }
    }

    Ok(SourceFile {
        package,
        declarations,
    })
}

fn build_declaration(pair: Pair<Rule>) -> Result<Declaration, String> {
    let mut name = None;
    let mut doc = Vec::new();
    let mut fields = None;
    let mut position = position_of(&pair);

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::doc_comments => {
                for line in inner.into_inner() {
                    if line.as_rule() == Rule::line_comment {
                        doc.push(line.as_str().to_string());
                    }
                }
            }
            Rule::ident => {
                position = position_of(&inner);
                name = Some(inner.as_str().to_string());
            }
            Rule::struct_body => fields = Some(build_struct_body(inner)?),
            _ => {}
        }
    }

    Ok(Declaration {
        name: name.ok_or("declaration: missing name")?,
        doc,
        fields: fields.ok_or("declaration: missing struct body")?,
        position,
    })
}

fn build_struct_body(pair: Pair<Rule>) -> Result<Vec<FieldDecl>, String> {
    let mut fields = Vec::new();
    for inner in pair.into_inner() {
        if inner.as_rule() == Rule::field {
            fields.extend(build_field(inner)?);
        }
    }
    Ok(fields)
}

/// A field line may name several fields sharing one type (`A, B uint32`).
fn build_field(pair: Pair<Rule>) -> Result<Vec<FieldDecl>, String> {
    let position = position_of(&pair);
    let mut names = Vec::new();
    let mut type_expr = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident_list => {
                for ident in inner.into_inner() {
                    if ident.as_rule() == Rule::ident {
                        names.push((ident.as_str().to_string(), position_of(&ident)));
                    }
                }
            }
            Rule::type_expr => type_expr = Some(build_type_expr(inner)?),
            _ => {}
        }
    }

    let type_expr = type_expr.ok_or("field: missing type")?;
    if names.is_empty() {
        return Ok(vec![FieldDecl {
            name: None,
            type_expr,
            position,
        }]);
    }
    Ok(names
        .into_iter()
        .map(|(name, position)| FieldDecl {
            name: Some(name),
            type_expr: type_expr.clone(),
            position,
        })
        .collect())
}

fn build_type_expr(pair: Pair<Rule>) -> Result<TypeExpr, String> {
    let inner = pair.into_inner().next().ok_or("Empty type_expr")?;
    match inner.as_rule() {
        Rule::named_type => Ok(TypeExpr::Named(inner.as_str().to_string())),
        Rule::slice_type => {
            let element = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::type_expr)
                .ok_or("[]T: missing element type")?;
            Ok(TypeExpr::Slice(Box::new(build_type_expr(element)?)))
        }
        Rule::array_type => {
            let mut len = None;
            let mut element = None;
            for part in inner.into_inner() {
                match part.as_rule() {
                    Rule::array_len => len = Some(parse_array_len(part.as_str())?),
                    Rule::type_expr => element = Some(build_type_expr(part)?),
                    _ => {}
                }
            }
            Ok(TypeExpr::Array {
                len: len.ok_or("[N]T: missing length")?,
                element: Box::new(element.ok_or("[N]T: missing element type")?),
            })
        }
        Rule::inline_struct => {
            let body = inner
                .into_inner()
                .find(|p| p.as_rule() == Rule::struct_body)
                .ok_or("struct: missing body")?;
            Ok(TypeExpr::Struct(build_struct_body(body)?))
        }
        Rule::map_type => Ok(TypeExpr::Unsupported(UnsupportedShape::Map)),
        Rule::pointer_type => Ok(TypeExpr::Unsupported(UnsupportedShape::Pointer)),
        Rule::func_type => Ok(TypeExpr::Unsupported(UnsupportedShape::Function)),
        Rule::chan_type => Ok(TypeExpr::Unsupported(UnsupportedShape::Channel)),
        Rule::interface_type => Ok(TypeExpr::Unsupported(UnsupportedShape::Interface)),
        _ => Err(format!("Unhandled type rule: {:?}", inner.as_rule())),
    }
}

fn parse_array_len(s: &str) -> Result<usize, String> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|_| format!("array length out of range: {}", s))
}

fn position_of(pair: &Pair<Rule>) -> Position {
    let (line, column) = pair.as_span().start_pos().line_col();
    Position { line, column }
}
