//! Code generation for `#[derive(TlvModel)]`
//!
//! Output per model:
//! - `{Name}Context` (hanya jika ada marker, argument, signature atau
//!   interest name)
//! - `impl TlvEncode`: SCHEMA, measure (pass 1), encode_into (pass 2)
//! - `impl TlvParse`: progress-ordered parse loop

use proc_macro2::{Literal, Span, TokenStream};
use quote::{format_ident, quote};
use syn::{DeriveInput, Lifetime, Result};

use crate::attrs::{parse_model, Condition, FieldDef, ModelDef, Shape, ValueKind};

pub fn expand(input: TokenStream) -> Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let model = parse_model(&input)?;
    Ok(generate(&model))
}

fn krate() -> TokenStream {
    quote!(::ndn_tlv)
}

fn kind_type(kind: ValueKind, no_copy: bool) -> TokenStream {
    let k = krate();
    let base = match kind {
        ValueKind::Natural => quote!(#k::protocol::kind::NaturalKind),
        ValueKind::Fixed(_) => quote!(#k::protocol::kind::FixedKind),
        ValueKind::Time => quote!(#k::protocol::kind::TimeKind),
        ValueKind::Binary => quote!(#k::protocol::kind::BinaryKind),
        ValueKind::Text => quote!(#k::protocol::kind::TextKind),
        ValueKind::Wire => quote!(#k::protocol::kind::WireKind),
        ValueKind::Name => quote!(#k::protocol::kind::NameKind),
        ValueKind::Struct => quote!(#k::protocol::kind::StructKind),
    };
    match kind {
        ValueKind::Binary | ValueKind::Wire if no_copy => {
            quote!(#k::protocol::kind::NoCopy<#base>)
        }
        _ => base,
    }
}

fn field_kind(kind: ValueKind) -> TokenStream {
    let k = krate();
    match kind {
        ValueKind::Natural => quote!(#k::FieldKind::Natural),
        ValueKind::Fixed(width) => {
            let width = Literal::u8_unsuffixed(width);
            quote!(#k::FieldKind::Fixed(#width))
        }
        ValueKind::Time => quote!(#k::FieldKind::Time),
        ValueKind::Binary => quote!(#k::FieldKind::Binary),
        ValueKind::Text => quote!(#k::FieldKind::Text),
        ValueKind::Wire => quote!(#k::FieldKind::Wire),
        ValueKind::Name => quote!(#k::FieldKind::Name),
        ValueKind::Struct => quote!(#k::FieldKind::Struct),
    }
}

/// `<K as Kind<V>>`
fn kind_path(kind: ValueKind, ty: &syn::Type, no_copy: bool) -> TokenStream {
    let k = krate();
    let kt = kind_type(kind, no_copy);
    quote!(<#kt as #k::protocol::kind::Kind<#ty>>)
}

/// `<K as ParseKind<'lt, V>>`
fn parse_path(kind: ValueKind, ty: &syn::Type, no_copy: bool, lt: &Lifetime) -> TokenStream {
    let k = krate();
    let kt = kind_type(kind, no_copy);
    quote!(<#kt as #k::protocol::kind::ParseKind<#lt, #ty>>)
}

fn signing() -> TokenStream {
    let k = krate();
    quote!(#k::protocol::signing)
}

/// Context member owned by a field, e.g. `sig_est_len`
fn ctx_member(field: &FieldDef, suffix: &str) -> syn::Ident {
    format_ident!("{}_{}", field.ident, suffix)
}

fn guard(condition: &Option<Condition>, body: TokenStream) -> TokenStream {
    match condition {
        Some(Condition {
            arg,
            expected: true,
        }) => quote!(if ctx.#arg { #body }),
        Some(Condition {
            arg,
            expected: false,
        }) => quote!(if !ctx.#arg { #body }),
        None => body,
    }
}

fn field_spec(field: &FieldDef) -> TokenStream {
    let k = krate();
    let name = field.ident.to_string();
    let type_num = Literal::u64_unsuffixed(field.type_num);
    let optional = field.optional;
    let inner = &field.inner;
    let struct_schema = quote!(::core::option::Option::Some(<#inner as #k::TlvEncode>::SCHEMA));
    let none = quote!(::core::option::Option::None);
    let single = quote!(#k::Cardinality::Single);

    let (kind, cardinality, nested) = match &field.shape {
        Shape::Single(kind) => (
            field_kind(*kind),
            single,
            if *kind == ValueKind::Struct { struct_schema } else { none },
        ),
        Shape::Sequence(kind) => (
            field_kind(*kind),
            quote!(#k::Cardinality::Sequence),
            if *kind == ValueKind::Struct { struct_schema } else { none },
        ),
        Shape::Map {
            key,
            value_type,
            value,
        } => {
            let key_kind = field_kind(*key);
            let value_kind = field_kind(*value);
            let value_type = Literal::u64_unsuffixed(*value_type);
            (
                key_kind.clone(),
                quote!(#k::Cardinality::Map {
                    key: #key_kind,
                    value_type: #value_type,
                    value: #value_kind,
                }),
                if *value == ValueKind::Struct { struct_schema } else { none },
            )
        }
        Shape::Bool => (quote!(#k::FieldKind::Bool), single, none),
        Shape::Signature { .. } => (quote!(#k::FieldKind::Signature), single, none),
        Shape::InterestName { .. } => (quote!(#k::FieldKind::InterestName), single, none),
        Shape::Marker => (quote!(#k::FieldKind::Marker), single, none),
        Shape::RangeMarker { .. } => (quote!(#k::FieldKind::RangeMarker), single, none),
        Shape::Arg => (quote!(#k::FieldKind::Argument), single, none),
    };
    let condition = match &field.condition {
        Some(cond) => {
            let arg = cond.arg.to_string();
            let expected = cond.expected;
            quote!(::core::option::Option::Some((#arg, #expected)))
        }
        None => quote!(::core::option::Option::None),
    };

    quote! {
        #k::FieldSpec {
            name: #name,
            type_num: #type_num,
            kind: #kind,
            optional: #optional,
            cardinality: #cardinality,
            nested: #nested,
            condition: #condition,
        }
    }
}

fn measure_field(model: &ModelDef, field: &FieldDef) -> TokenStream {
    let k = krate();
    let ident = &field.ident;
    let tn = Literal::u64_unsuffixed(field.type_num);
    let inner = &field.inner;
    let body = match &field.shape {
        Shape::Single(kind) => {
            let kp = kind_path(*kind, inner, model.no_copy);
            if field.optional {
                quote! {
                    if let ::core::option::Option::Some(value) = &self.#ident {
                        len += #k::tlv_len(#tn, #kp::measure(value, plan));
                    }
                }
            } else {
                quote!(len += #k::tlv_len(#tn, #kp::measure(&self.#ident, plan));)
            }
        }
        Shape::Bool => quote! {
            if self.#ident {
                len += #k::tlv_len(#tn, 0);
            }
        },
        Shape::Sequence(kind) => {
            let kp = kind_path(*kind, inner, model.no_copy);
            quote! {
                for value in &self.#ident {
                    len += #k::tlv_len(#tn, #kp::measure(value, plan));
                }
            }
        }
        Shape::Map {
            key,
            value_type,
            value,
        } => {
            let key_ty = field.key.as_ref().unwrap_or(inner);
            let kp = kind_path(*key, key_ty, model.no_copy);
            let vp = kind_path(*value, inner, model.no_copy);
            let vt = Literal::u64_unsuffixed(*value_type);
            quote! {
                for (key, value) in &self.#ident {
                    len += #k::tlv_len(#tn, #kp::measure(key, plan));
                    len += #k::tlv_len(#vt, #vp::measure(value, plan));
                }
            }
        }
        Shape::Signature { .. } => {
            let s = signing();
            let est = ctx_member(field, "est_len");
            quote!(len += #s::signature_len(#tn, self.#ident.as_ref(), ctx.#est);)
        }
        Shape::InterestName { .. } => {
            let s = signing();
            let need = ctx_member(field, "need_digest");
            quote! {
                if let ::core::option::Option::Some(value) = &self.#ident {
                    len += #k::tlv_len(#tn, #s::interest_name_len(value, ctx.#need));
                }
            }
        }
        Shape::Marker | Shape::RangeMarker { .. } | Shape::Arg => return TokenStream::new(),
    };
    guard(&field.condition, body)
}

fn encode_field(model: &ModelDef, field: &FieldDef) -> TokenStream {
    let ident = &field.ident;
    let tn = Literal::u64_unsuffixed(field.type_num);
    let inner = &field.inner;
    let body = match &field.shape {
        Shape::Single(kind) => {
            let kp = kind_path(*kind, inner, model.no_copy);
            if field.optional {
                quote! {
                    if let ::core::option::Option::Some(value) = &self.#ident {
                        #kp::encode(#tn, value, enc);
                    }
                }
            } else {
                quote!(#kp::encode(#tn, &self.#ident, enc);)
            }
        }
        Shape::Bool => quote! {
            if self.#ident {
                enc.put_header(#tn, 0);
            }
        },
        Shape::Sequence(kind) => {
            let kp = kind_path(*kind, inner, model.no_copy);
            quote! {
                for value in &self.#ident {
                    #kp::encode(#tn, value, enc);
                }
            }
        }
        Shape::Map {
            key,
            value_type,
            value,
        } => {
            let key_ty = field.key.as_ref().unwrap_or(inner);
            let kp = kind_path(*key, key_ty, model.no_copy);
            let vp = kind_path(*value, inner, model.no_copy);
            let vt = Literal::u64_unsuffixed(*value_type);
            quote! {
                for (key, value) in &self.#ident {
                    #kp::encode(#tn, key, enc);
                    #vp::encode(#vt, value, enc);
                }
            }
        }
        Shape::Signature { start, covered } => {
            let s = signing();
            let est = ctx_member(field, "est_len");
            let slot = ctx_member(field, "slot");
            quote! {
                ctx.#slot = #s::encode_signature(#tn, self.#ident.as_ref(), ctx.#est, enc);
                if let ::core::option::Option::Some(slot) = ctx.#slot {
                    ctx.#covered.push(ctx.#start, slot.start);
                }
            }
        }
        Shape::InterestName { covered } => {
            let s = signing();
            let need = ctx_member(field, "need_digest");
            let digest = ctx_member(field, "digest");
            quote! {
                if let ::core::option::Option::Some(value) = &self.#ident {
                    ctx.#digest = #s::encode_interest_name(
                        #tn,
                        value,
                        ctx.#need,
                        enc,
                        &mut ctx.#covered,
                    );
                }
            }
        }
        Shape::Marker => return quote!(ctx.#ident = enc.position();),
        Shape::RangeMarker { start, covered } => {
            return quote! {
                ctx.#ident = enc.position();
                ctx.#covered.push(ctx.#start, ctx.#ident);
            }
        }
        Shape::Arg => return TokenStream::new(),
    };
    guard(&field.condition, body)
}

fn slot_ident(idx: usize) -> syn::Ident {
    format_ident!("__slot{}", idx)
}

fn slot_decl(idx: usize, field: &FieldDef) -> TokenStream {
    let slot = slot_ident(idx);
    let inner = &field.inner;
    let ty = &field.ty;
    match &field.shape {
        Shape::Single(_) | Shape::Signature { .. } | Shape::InterestName { .. } => {
            quote!(let mut #slot: ::core::option::Option<#inner> = ::core::option::Option::None;)
        }
        Shape::Bool => quote!(let mut #slot = false;),
        Shape::Sequence(_) | Shape::Map { .. } => {
            quote!(let mut #slot: #ty = ::core::default::Default::default();)
        }
        Shape::Marker | Shape::RangeMarker { .. } | Shape::Arg => TokenStream::new(),
    }
}

/// Match arm body for a TLV accepted by field `idx`
fn parse_arm(model: &ModelDef, idx: usize, field: &FieldDef, lt: &Lifetime) -> TokenStream {
    let k = krate();
    let slot = slot_ident(idx);
    let inner = &field.inner;
    let next = Literal::usize_unsuffixed(idx + 1);
    match &field.shape {
        Shape::Single(kind) => {
            let pp = parse_path(*kind, inner, model.no_copy, lt);
            quote! {
                #slot = ::core::option::Option::Some(#pp::parse(reader.delegate(len)?, ignore_critical)?);
                progress = #next;
            }
        }
        Shape::Bool => quote! {
            #slot = true;
            reader.skip(len)?;
            progress = #next;
        },
        Shape::Sequence(kind) => {
            let pp = parse_path(*kind, inner, model.no_copy, lt);
            quote! {
                #slot.push(#pp::parse(reader.delegate(len)?, ignore_critical)?);
            }
        }
        Shape::Map {
            key,
            value_type,
            value,
        } => {
            let key_ty = field.key.as_ref().unwrap_or(inner);
            let kp = parse_path(*key, key_ty, model.no_copy, lt);
            let vp = parse_path(*value, inner, model.no_copy, lt);
            let vt = Literal::u64_unsuffixed(*value_type);
            quote! {
                let key = #kp::parse(reader.delegate(len)?, ignore_critical)?;
                let value_len = #k::read_map_value(reader, #vt)?;
                let value = #vp::parse(reader.delegate(value_len)?, ignore_critical)?;
                #slot.insert(key, value);
            }
        }
        Shape::Signature { start, covered } => {
            let pp = parse_path(ValueKind::Wire, inner, model.no_copy, lt);
            let sig_slot = ctx_member(field, "slot");
            let tn = Literal::u64_unsuffixed(field.type_num);
            quote! {
                ctx.#covered.push(ctx.#start, start);
                #slot = ::core::option::Option::Some(#pp::parse(reader.delegate(len)?, ignore_critical)?);
                ctx.#sig_slot = ::core::option::Option::Some(#k::SignatureSlot {
                    typ: #tn,
                    start,
                    end: reader.pos(),
                });
                progress = #next;
            }
        }
        Shape::InterestName { covered } => {
            let s = signing();
            let digest = ctx_member(field, "digest");
            quote! {
                let (value, digest) =
                    #s::parse_interest_name(reader.delegate(len)?, &mut ctx.#covered)?;
                ctx.#digest = digest;
                #slot = ::core::option::Option::Some(value);
                progress = #next;
            }
        }
        Shape::Marker | Shape::RangeMarker { .. } | Shape::Arg => TokenStream::new(),
    }
}

fn accept_expr(field: &FieldDef) -> TokenStream {
    let tn = Literal::u64_unsuffixed(field.type_num);
    match &field.condition {
        Some(Condition {
            arg,
            expected: true,
        }) => quote!(typ == #tn && ctx.#arg),
        Some(Condition {
            arg,
            expected: false,
        }) => quote!(typ == #tn && !ctx.#arg),
        None => quote!(typ == #tn),
    }
}

fn construct_field(idx: usize, field: &FieldDef) -> TokenStream {
    let k = krate();
    let ident = &field.ident;
    let slot = slot_ident(idx);
    match &field.shape {
        Shape::Single(_) if !field.optional => {
            let name = ident.to_string();
            let tn = Literal::u64_unsuffixed(field.type_num);
            quote! {
                #ident: #slot.ok_or(#k::FormatError::MissingField {
                    name: #name,
                    type_num: #tn,
                })?
            }
        }
        Shape::Single(_)
        | Shape::Bool
        | Shape::Sequence(_)
        | Shape::Map { .. }
        | Shape::Signature { .. }
        | Shape::InterestName { .. } => quote!(#ident: #slot),
        Shape::Marker | Shape::RangeMarker { .. } => quote!(#ident: #k::Marker),
        Shape::Arg => quote!(#ident: #k::Arg::new()),
    }
}

fn generate(model: &ModelDef) -> TokenStream {
    let k = krate();
    let ident = &model.ident;
    let vis = &model.vis;
    let name = ident.to_string();
    let no_copy = model.no_copy;
    let (impl_generics, ty_generics, where_clause) = model.generics.split_for_impl();

    let (context_ty, context_def) = if model.has_context() {
        let ctx_ident = format_ident!("{}Context", ident);
        let doc = format!("Marker offsets and arguments of [`{}`].", ident);
        let members = model.fields.iter().map(|f| {
            let fi = &f.ident;
            match f.shape {
                Shape::Marker | Shape::RangeMarker { .. } => quote!(pub #fi: usize,),
                Shape::Arg => {
                    let ty = &f.inner;
                    quote!(pub #fi: #ty,)
                }
                Shape::Signature { .. } => {
                    let est = ctx_member(f, "est_len");
                    let slot = ctx_member(f, "slot");
                    quote! {
                        /// Placeholder size written when the signature is absent
                        pub #est: usize,
                        pub #slot: ::core::option::Option<#k::SignatureSlot>,
                    }
                }
                Shape::InterestName { .. } => {
                    let need = ctx_member(f, "need_digest");
                    let digest = ctx_member(f, "digest");
                    quote! {
                        /// Append a zeroed parameters digest when encoding
                        pub #need: bool,
                        /// Offset of the parameters digest value
                        pub #digest: ::core::option::Option<usize>,
                    }
                }
                _ => TokenStream::new(),
            }
        });
        (
            quote!(#ctx_ident),
            quote! {
                #[doc = #doc]
                #[derive(Debug, Clone, Default, PartialEq)]
                #vis struct #ctx_ident {
                    #(#members)*
                }
            },
        )
    } else {
        (quote!(()), TokenStream::new())
    };

    let specs = model.fields.iter().map(field_spec);
    let measures = model.fields.iter().map(|f| measure_field(model, f));
    let encodes = model.fields.iter().map(|f| encode_field(model, f));

    // Parse side
    let lt = model
        .lifetime
        .clone()
        .unwrap_or_else(|| Lifetime::new("'__tlv", Span::call_site()));
    let parse_impl_generics = match &model.lifetime {
        Some(_) => quote!(#impl_generics),
        None => quote!(<#lt>),
    };
    let count = Literal::usize_unsuffixed(model.fields.len());
    let slots = model
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| slot_decl(i, f));
    let wire_fields: Vec<_> = model
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.shape.on_wire())
        .collect();
    let accept_arms = wire_fields.iter().map(|(i, f)| {
        let i = Literal::usize_unsuffixed(*i);
        let expr = accept_expr(f);
        quote!(#i => #expr,)
    });
    let parse_arms = wire_fields.iter().map(|(i, f)| {
        let body = parse_arm(model, *i, f, &lt);
        let i = Literal::usize_unsuffixed(*i);
        quote!(#i => { #body })
    });
    let marker_fields: Vec<_> = model
        .fields
        .iter()
        .enumerate()
        .filter(|(_, f)| matches!(f.shape, Shape::Marker | Shape::RangeMarker { .. }))
        .collect();
    let finalize_at = |pos: TokenStream| {
        marker_fields
            .iter()
            .map(|(i, f)| {
                let i = Literal::usize_unsuffixed(*i);
                let fi = &f.ident;
                match &f.shape {
                    Shape::RangeMarker { start, covered } => quote! {
                        #i => {
                            ctx.#fi = #pos;
                            ctx.#covered.push(ctx.#start, #pos);
                        }
                    },
                    _ => quote!(#i => ctx.#fi = #pos,),
                }
            })
            .collect::<Vec<_>>()
    };
    let finalize_start = finalize_at(quote!(start));
    let finalize_end = finalize_at(quote!(end));
    let constructs = model
        .fields
        .iter()
        .enumerate()
        .map(|(i, f)| construct_field(i, f));

    quote! {
        #context_def

        #[automatically_derived]
        impl #impl_generics #k::TlvEncode for #ident #ty_generics #where_clause {
            type Context = #context_ty;

            const NO_COPY: bool = #no_copy;

            const SCHEMA: &'static #k::Schema = &#k::Schema {
                name: #name,
                fields: &[#(#specs),*],
            };

            #[allow(unused_variables, unused_mut)]
            fn measure(&self, ctx: &Self::Context, plan: &mut #k::LengthPlan) -> usize {
                let mut len = 0usize;
                #(#measures)*
                len
            }

            #[allow(unused_variables)]
            fn encode_into<'__v>(&'__v self, enc: &mut #k::Encoder<'__v>, ctx: &mut Self::Context) {
                #(#encodes)*
            }
        }

        #[automatically_derived]
        impl #parse_impl_generics #k::TlvParse<#lt> for #ident #ty_generics #where_clause {
            #[allow(unused_variables, unused_mut, unused_assignments, unused_comparisons)]
            fn parse_from(
                reader: &mut #k::Reader<#lt>,
                ignore_critical: bool,
                ctx: &mut Self::Context,
            ) -> #k::Result<Self> {
                #(#slots)*
                let mut progress = 0usize;

                while !reader.is_empty() {
                    let start = reader.pos();
                    let typ = reader.read_varnum()?;
                    let len = reader.read_length()?;

                    let mut matched = ::core::option::Option::None;
                    let mut idx = progress;
                    while idx < #count {
                        let accepted = match idx {
                            #(#accept_arms)*
                            _ => false,
                        };
                        if accepted {
                            matched = ::core::option::Option::Some(idx);
                            break;
                        }
                        idx += 1;
                    }

                    let ::core::option::Option::Some(idx) = matched else {
                        #k::skip_unrecognized(reader, typ, len, ignore_critical)?;
                        continue;
                    };
                    // Field yang dilewati: marker menunjuk ke awal TLV ini
                    while progress < idx {
                        match progress {
                            #(#finalize_start)*
                            _ => {}
                        }
                        progress += 1;
                    }
                    match idx {
                        #(#parse_arms)*
                        _ => {}
                    }
                }

                let end = reader.pos();
                while progress < #count {
                    match progress {
                        #(#finalize_end)*
                        _ => {}
                    }
                    progress += 1;
                }

                ::core::result::Result::Ok(Self {
                    #(#constructs,)*
                })
            }
        }
    }
}
