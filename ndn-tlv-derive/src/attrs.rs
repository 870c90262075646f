//! Parsing of `#[tlv(...)]` attributes into a model description.
//!
//! Struct level:
//! - `#[tlv(nocopy)]` - binary/wire fields borrow from the input buffer
//!
//! Field level:
//! - `#[tlv(<type>, <kind>)]` with `<kind>` one of `natural`, `fixed`, `time`,
//!   `binary`, `string`, `wire`, `name`, `bool`, `struct`,
//!   `sequence(<kind>)`, `map(<key kind> => <value type>, <value kind>)`
//! - `#[tlv(marker)]`, `#[tlv(arg)]` - zero-width pseudo-fields
//! - `#[tlv(range_marker(start, covered))]` - marker that records the
//!   range from marker `start` into argument `covered`
//! - `#[tlv(<type>, signature(start, covered))]` - signature value; the
//!   range from marker `start` to the signature TLV goes into `covered`
//! - `#[tlv(<type>, interest_name(covered))]` - name that may carry a
//!   parameters digest; components before the digest go into `covered`
//! - `when = "arg"` / `unless = "arg"` - gate a field on a `bool` argument
//!
//! A field is optional when its Rust type is `Option<...>`.

use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{
    parenthesized, token, Data, DeriveInput, Error, Field, Fields, GenericArgument, GenericParam,
    Ident, Lifetime, LitInt, LitStr, PathArguments, Result, Token, Type, Visibility,
};

/// Value encoding of a single TLV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Natural,
    Fixed(u8),
    Time,
    Binary,
    Text,
    Wire,
    Name,
    Struct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    Single(ValueKind),
    Bool,
    Sequence(ValueKind),
    Map {
        key: ValueKind,
        value_type: u64,
        value: ValueKind,
    },
    Signature {
        start: Ident,
        covered: Ident,
    },
    InterestName {
        covered: Ident,
    },
    Marker,
    RangeMarker {
        start: Ident,
        covered: Ident,
    },
    Arg,
}

impl Shape {
    pub fn on_wire(&self) -> bool {
        !matches!(self, Shape::Marker | Shape::RangeMarker { .. } | Shape::Arg)
    }

    /// Fields that own members of the generated context
    pub fn in_context(&self) -> bool {
        !self.on_wire() || matches!(self, Shape::Signature { .. } | Shape::InterestName { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Condition {
    pub arg: Ident,
    pub expected: bool,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub ident: Ident,
    pub ty: Type,
    /// Zero for markers and arguments
    pub type_num: u64,
    pub shape: Shape,
    pub optional: bool,
    /// Value type handed to the kind: `Option`/`Vec` stripped, map value,
    /// or the `T` of `Arg<T>`
    pub inner: Type,
    /// Map key type
    pub key: Option<Type>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone)]
pub struct ModelDef {
    pub ident: Ident,
    pub vis: Visibility,
    pub generics: syn::Generics,
    pub lifetime: Option<Lifetime>,
    pub no_copy: bool,
    pub fields: Vec<FieldDef>,
}

impl ModelDef {
    pub fn has_context(&self) -> bool {
        self.fields.iter().any(|f| f.shape.in_context())
    }
}

enum RawKind {
    Word(Ident),
    Sequence(Ident),
    Map {
        key: Ident,
        value_type: LitInt,
        value: Ident,
    },
    Signature {
        start: Ident,
        covered: Ident,
    },
    InterestName(Ident),
    RangeMarker {
        start: Ident,
        covered: Ident,
    },
}

/// `a, b` inside a kind's parentheses
fn ident_pair(content: ParseStream) -> Result<(Ident, Ident)> {
    let first = content.parse()?;
    content.parse::<Token![,]>()?;
    let second = content.parse()?;
    Ok((first, second))
}

enum Item {
    TypeNum(LitInt),
    Kind(RawKind),
    When(LitStr),
    Unless(LitStr),
}

impl Parse for Item {
    fn parse(input: ParseStream) -> Result<Self> {
        if input.peek(LitInt) {
            return Ok(Item::TypeNum(input.parse()?));
        }

        let word = input.call(Ident::parse_any)?;
        if input.peek(Token![=]) {
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;
            return match word.to_string().as_str() {
                "when" => Ok(Item::When(value)),
                "unless" => Ok(Item::Unless(value)),
                other => Err(Error::new_spanned(
                    &word,
                    format!("unknown tlv option `{}`", other),
                )),
            };
        }

        if !input.peek(token::Paren) {
            return Ok(Item::Kind(RawKind::Word(word)));
        }

        let content;
        parenthesized!(content in input);
        let kind = match word.to_string().as_str() {
            "sequence" => RawKind::Sequence(content.call(Ident::parse_any)?),
            "map" => {
                let key = content.call(Ident::parse_any)?;
                content.parse::<Token![=>]>()?;
                let value_type: LitInt = content.parse()?;
                content.parse::<Token![,]>()?;
                let value = content.call(Ident::parse_any)?;
                RawKind::Map {
                    key,
                    value_type,
                    value,
                }
            }
            "signature" => {
                let (start, covered) = ident_pair(&content)?;
                RawKind::Signature { start, covered }
            }
            "interest_name" => RawKind::InterestName(content.parse()?),
            "range_marker" => {
                let (start, covered) = ident_pair(&content)?;
                RawKind::RangeMarker { start, covered }
            }
            other => {
                return Err(Error::new_spanned(
                    &word,
                    format!("`{}` does not take arguments", other),
                ))
            }
        };
        if !content.is_empty() {
            return Err(content.error("unexpected tokens in field kind"));
        }
        Ok(Item::Kind(kind))
    }
}

/// Type arguments of `ty` if its last path segment is named `outer`
/// (any name when `outer` is `None`).
fn type_args<'t>(ty: &'t Type, outer: Option<&str>) -> Option<Vec<&'t Type>> {
    let Type::Path(path) = ty else {
        return None;
    };
    let last = path.path.segments.last()?;
    if outer.is_some_and(|name| last.ident != name) {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return None;
    };
    Some(
        args.args
            .iter()
            .filter_map(|arg| match arg {
                GenericArgument::Type(t) => Some(t),
                _ => None,
            })
            .collect(),
    )
}

fn single_arg<'t>(ty: &'t Type, outer: &str) -> Option<&'t Type> {
    match type_args(ty, Some(outer))?.as_slice() {
        [inner] => Some(inner),
        _ => None,
    }
}

fn is_named(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(path) => path.path.segments.last().is_some_and(|s| s.ident == name),
        _ => false,
    }
}

fn fixed_width(ty: &Type) -> Option<u8> {
    let Type::Path(path) = ty else {
        return None;
    };
    match path.path.get_ident()?.to_string().as_str() {
        "u8" => Some(1),
        "u16" => Some(2),
        "u32" => Some(4),
        "u64" => Some(8),
        _ => None,
    }
}

fn value_kind(word: &Ident, ty: &Type) -> Result<ValueKind> {
    Ok(match word.to_string().as_str() {
        "natural" => ValueKind::Natural,
        "fixed" => {
            let width = fixed_width(ty).ok_or_else(|| {
                Error::new_spanned(ty, "`fixed` fields must be u8, u16, u32 or u64")
            })?;
            ValueKind::Fixed(width)
        }
        "time" => ValueKind::Time,
        "binary" => ValueKind::Binary,
        "string" => ValueKind::Text,
        "wire" => ValueKind::Wire,
        "name" => ValueKind::Name,
        "struct" => ValueKind::Struct,
        other => {
            return Err(Error::new_spanned(
                word,
                format!("unknown field kind `{}`", other),
            ))
        }
    })
}

fn parse_field(field: &Field) -> Result<FieldDef> {
    let ident = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "TlvModel fields must be named"))?;
    let attr = field
        .attrs
        .iter()
        .find(|a| a.path().is_ident("tlv"))
        .ok_or_else(|| {
            Error::new_spanned(
                &ident,
                format!("field `{}` needs a #[tlv(...)] attribute", ident),
            )
        })?;
    let items = attr.parse_args_with(Punctuated::<Item, Token![,]>::parse_terminated)?;

    let mut type_num: Option<(u64, LitInt)> = None;
    let mut kind: Option<RawKind> = None;
    let mut condition: Option<Condition> = None;
    for item in items {
        match item {
            Item::TypeNum(lit) => {
                if type_num.is_some() {
                    return Err(Error::new_spanned(lit, "duplicate TLV type number"));
                }
                let value: u64 = lit.base10_parse()?;
                if value == 0 {
                    return Err(Error::new_spanned(lit, "TLV type number must be non-zero"));
                }
                type_num = Some((value, lit));
            }
            Item::Kind(raw) => {
                if kind.is_some() {
                    return Err(Error::new_spanned(attr, "field kind given twice"));
                }
                kind = Some(raw);
            }
            Item::When(lit) | Item::Unless(lit) if condition.is_some() => {
                return Err(Error::new_spanned(lit, "only one of `when`/`unless` allowed"));
            }
            Item::When(lit) => {
                condition = Some(Condition {
                    arg: lit.parse()?,
                    expected: true,
                })
            }
            Item::Unless(lit) => {
                condition = Some(Condition {
                    arg: lit.parse()?,
                    expected: false,
                })
            }
        }
    }

    let raw = kind.ok_or_else(|| Error::new_spanned(attr, "missing field kind"))?;
    let ty = field.ty.clone();

    if let RawKind::RangeMarker { start, covered } = &raw {
        if let Some((_, lit)) = &type_num {
            return Err(Error::new_spanned(
                lit,
                "markers and arguments are not on the wire and take no type number",
            ));
        }
        if let Some(cond) = &condition {
            return Err(Error::new_spanned(
                &cond.arg,
                "markers and arguments cannot be conditional",
            ));
        }
        if !is_named(&ty, "Marker") {
            return Err(Error::new_spanned(&ty, "marker fields must have type `Marker`"));
        }
        return Ok(FieldDef {
            ident,
            inner: ty.clone(),
            ty,
            type_num: 0,
            shape: Shape::RangeMarker {
                start: start.clone(),
                covered: covered.clone(),
            },
            optional: false,
            key: None,
            condition: None,
        });
    }

    // Pseudo-fields: tidak ada di wire
    if let RawKind::Word(word) = &raw {
        let pseudo = word == "marker" || word == "arg";
        if pseudo {
            if let Some((_, lit)) = &type_num {
                return Err(Error::new_spanned(
                    lit,
                    "markers and arguments are not on the wire and take no type number",
                ));
            }
            if let Some(cond) = &condition {
                return Err(Error::new_spanned(
                    &cond.arg,
                    "markers and arguments cannot be conditional",
                ));
            }
        }
        if word == "marker" {
            if !is_named(&ty, "Marker") {
                return Err(Error::new_spanned(&ty, "marker fields must have type `Marker`"));
            }
            return Ok(FieldDef {
                ident,
                inner: ty.clone(),
                ty,
                type_num: 0,
                shape: Shape::Marker,
                optional: false,
                key: None,
                condition: None,
            });
        }
        if word == "arg" {
            let inner = single_arg(&ty, "Arg").cloned().ok_or_else(|| {
                Error::new_spanned(&ty, "argument fields must have type `Arg<T>`")
            })?;
            return Ok(FieldDef {
                ident,
                ty,
                type_num: 0,
                shape: Shape::Arg,
                optional: false,
                inner,
                key: None,
                condition: None,
            });
        }
    }

    let type_num = match type_num {
        Some((value, _)) => value,
        None => {
            return Err(Error::new_spanned(
                attr,
                format!("field `{}` needs a TLV type number", ident),
            ))
        }
    };
    let optional_inner = single_arg(&ty, "Option").cloned();

    if let RawKind::Signature { .. } | RawKind::InterestName(_) = &raw {
        if let Some(cond) = &condition {
            return Err(Error::new_spanned(
                &cond.arg,
                "signature and interest name fields cannot be conditional",
            ));
        }
    }

    let (shape, inner, key) = match raw {
        RawKind::Signature { start, covered } => {
            let inner = optional_inner
                .clone()
                .filter(|t| is_named(t, "Wire"))
                .ok_or_else(|| {
                    Error::new_spanned(&ty, "signature fields must be `Option<Wire<..>>`")
                })?;
            (Shape::Signature { start, covered }, inner, None)
        }
        RawKind::InterestName(covered) => {
            let inner = optional_inner
                .clone()
                .filter(|t| is_named(t, "Name"))
                .ok_or_else(|| {
                    Error::new_spanned(&ty, "interest name fields must be `Option<Name>`")
                })?;
            (Shape::InterestName { covered }, inner, None)
        }
        RawKind::RangeMarker { start, .. } => {
            return Err(Error::new_spanned(start, "range markers take no type number"))
        }
        RawKind::Word(word) if word == "bool" => {
            if optional_inner.is_some() {
                return Err(Error::new_spanned(
                    &ty,
                    "bool fields cannot be optional; absence already means false",
                ));
            }
            (Shape::Bool, ty.clone(), None)
        }
        RawKind::Word(word) => {
            let inner = optional_inner.clone().unwrap_or_else(|| ty.clone());
            (Shape::Single(value_kind(&word, &inner)?), inner, None)
        }
        RawKind::Sequence(word) => {
            if optional_inner.is_some() {
                return Err(Error::new_spanned(
                    &ty,
                    "sequence fields cannot be optional; an empty Vec encodes to nothing",
                ));
            }
            let elem = single_arg(&ty, "Vec")
                .cloned()
                .ok_or_else(|| Error::new_spanned(&ty, "sequence fields must be `Vec<T>`"))?;
            (Shape::Sequence(value_kind(&word, &elem)?), elem, None)
        }
        RawKind::Map {
            key,
            value_type,
            value,
        } => {
            let args = type_args(&ty, None).unwrap_or_default();
            let [key_ty, value_ty] = args.as_slice() else {
                return Err(Error::new_spanned(
                    &ty,
                    "map fields must be a map type with key and value parameters",
                ));
            };
            let vt: u64 = value_type.base10_parse()?;
            if vt == 0 {
                return Err(Error::new_spanned(
                    value_type,
                    "TLV type number must be non-zero",
                ));
            }
            let shape = Shape::Map {
                key: value_kind(&key, key_ty)?,
                value_type: vt,
                value: value_kind(&value, value_ty)?,
            };
            (shape, (*value_ty).clone(), Some((*key_ty).clone()))
        }
    };

    let optional = matches!(
        shape,
        Shape::Single(_) | Shape::Signature { .. } | Shape::InterestName { .. }
    ) && optional_inner.is_some();
    if let Some(cond) = &condition {
        if matches!(shape, Shape::Single(_)) && !optional {
            return Err(Error::new_spanned(
                &cond.arg,
                "conditional fields must be optional (`Option<T>`), a bool, or a collection",
            ));
        }
    }

    Ok(FieldDef {
        ident,
        ty,
        type_num,
        shape,
        optional,
        inner,
        key,
        condition,
    })
}

fn parse_struct_options(input: &DeriveInput) -> Result<bool> {
    let mut no_copy = false;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("tlv")) {
        let options = attr.parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)?;
        for option in options {
            if option == "nocopy" {
                no_copy = true;
            } else {
                return Err(Error::new_spanned(
                    &option,
                    format!("unknown model option `{}`", option),
                ));
            }
        }
    }
    Ok(no_copy)
}

pub fn parse_model(input: &DeriveInput) -> Result<ModelDef> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "TlvModel can only be derived for structs",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &input.ident,
            "TlvModel requires a struct with named fields",
        ));
    };

    let mut lifetime = None;
    for param in &input.generics.params {
        match param {
            GenericParam::Lifetime(def) if lifetime.is_none() => {
                lifetime = Some(def.lifetime.clone());
            }
            GenericParam::Lifetime(def) => {
                return Err(Error::new_spanned(
                    def,
                    "TlvModel supports at most one lifetime parameter",
                ));
            }
            other => {
                return Err(Error::new_spanned(
                    other,
                    "TlvModel does not support type or const parameters",
                ));
            }
        }
    }

    let no_copy = parse_struct_options(input)?;
    let fields = named
        .named
        .iter()
        .map(parse_field)
        .collect::<Result<Vec<_>>>()?;

    let is_arg = |name: &Ident| fields.iter().any(|f| f.shape == Shape::Arg && &f.ident == name);
    let not_an_arg = |name: &Ident| {
        Error::new_spanned(
            name,
            format!("`{}` is not an argument of this model", name),
        )
    };

    for (idx, field) in fields.iter().enumerate() {
        if let Some(cond) = &field.condition {
            if !is_arg(&cond.arg) {
                return Err(not_an_arg(&cond.arg));
            }
        }
        let (start, covered) = match &field.shape {
            Shape::Signature { start, covered } | Shape::RangeMarker { start, covered } => {
                (Some(start), covered)
            }
            Shape::InterestName { covered } => (None, covered),
            _ => continue,
        };
        if !is_arg(covered) {
            return Err(not_an_arg(covered));
        }
        // Start marker harus sudah lewat saat field ini diproses
        if let Some(start) = start {
            let earlier = fields[..idx]
                .iter()
                .any(|f| f.shape == Shape::Marker && &f.ident == start);
            if !earlier {
                return Err(Error::new_spanned(
                    start,
                    format!("`{}` is not a marker declared before `{}`", start, field.ident),
                ));
            }
        }
    }

    Ok(ModelDef {
        ident: input.ident.clone(),
        vis: input.vis.clone(),
        generics: input.generics.clone(),
        lifetime,
        no_copy,
        fields,
    })
}
