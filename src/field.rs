//! Field type classification: type expression -> [`FieldKind`].
//!
//! Precedence: inline `struct { ... }`, `[N]T`, `[]T`, primitive keyword, then
//! any other identifier as a struct reference. Container elements are resolved
//! one level deep only.

use crate::ast::{FieldDecl, Position, TypeExpr};
use crate::error::Error;
use crate::layout::{ElementKind, FieldKind, FieldLayout, Primitive};

/// A classified field, plus the body of an inline struct that the caller must
/// turn into its own layout under the name the field now refers to.
#[derive(Debug, Clone)]
pub struct ClassifiedField {
    pub layout: FieldLayout,
    pub inline: Option<InlineStruct>,
}

#[derive(Debug, Clone)]
pub struct InlineStruct {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

/// Classify field `name` of declaration `owner`.
pub fn classify(
    owner: &str,
    name: &str,
    type_expr: &TypeExpr,
    position: Position,
) -> Result<ClassifiedField, Error> {
    let mut inline = None;
    let kind = match type_expr {
        TypeExpr::Struct(fields) => {
            let struct_name = inline_name(owner, name);
            inline = Some(InlineStruct {
                name: struct_name.clone(),
                fields: fields.clone(),
            });
            FieldKind::Struct(struct_name)
        }
        TypeExpr::Array { len, element } => FieldKind::Array {
            bound: *len,
            element: classify_element(owner, name, element, position, &mut inline)?,
        },
        TypeExpr::Slice(element) => FieldKind::Slice(classify_element(
            owner,
            name,
            element,
            position,
            &mut inline,
        )?),
        TypeExpr::Named(ident) => match Primitive::from_keyword(ident) {
            Some(p) => FieldKind::Primitive(p),
            None => FieldKind::Struct(ident.clone()),
        },
        TypeExpr::Unsupported(shape) => {
            return Err(Error::UnsupportedFieldType {
                field: name.to_string(),
                position,
                shape: *shape,
            })
        }
    };

    Ok(ClassifiedField {
        layout: FieldLayout::new(name.to_string(), kind),
        inline,
    })
}

/// Element of `[N]T` / `[]T`. A nested container (`[][]byte`) is not rejected:
/// its innermost element is used, so it reads as `[]byte`.
fn classify_element(
    owner: &str,
    field: &str,
    element: &TypeExpr,
    position: Position,
    inline: &mut Option<InlineStruct>,
) -> Result<ElementKind, Error> {
    let mut innermost = element;
    while let TypeExpr::Array { element, .. } | TypeExpr::Slice(element) = innermost {
        innermost = &**element;
    }
    if !std::ptr::eq(innermost, element) {
        tracing::warn!(
            field = %format!("{}.{}", owner, field),
            %position,
            "nested container flattened to a single level"
        );
    }

    match innermost {
        TypeExpr::Named(ident) => Ok(match Primitive::from_keyword(ident) {
            Some(p) => ElementKind::Primitive(p),
            None => ElementKind::Struct(ident.clone()),
        }),
        TypeExpr::Struct(fields) => {
            let struct_name = inline_name(owner, field);
            *inline = Some(InlineStruct {
                name: struct_name.clone(),
                fields: fields.clone(),
            });
            Ok(ElementKind::Struct(struct_name))
        }
        TypeExpr::Unsupported(shape) => Err(Error::UnsupportedFieldType {
            field: field.to_string(),
            position,
            shape: *shape,
        }),
        TypeExpr::Array { .. } | TypeExpr::Slice(_) => unreachable!("containers peeled above"),
    }
}

/// `Owner` + PascalCase(`field`): `KitchenSink` / `extra_opts` -> `KitchenSinkExtraOpts`.
pub fn inline_name(owner: &str, field: &str) -> String {
    let mut name = owner.to_string();
    let mut upper = true;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            name.extend(c.to_uppercase());
            upper = false;
        } else {
            name.push(c);
        }
    }
    name
}
