//! `#[derive(TlvModel)]` untuk ndn-tlv
//!
//! Schema compiler: anotasi `#[tlv(...)]` pada struct di-compile menjadi
//! implementasi `TlvEncode` + `TlvParse` yang memanggil value kind secara
//! langsung. Tidak ada reflection atau dispatch saat runtime.

mod attrs;
mod expand;

use proc_macro::TokenStream;

/// Derive the TLV codec of a struct.
///
/// ```ignore
/// #[derive(TlvModel)]
/// struct MetaInfo {
///     #[tlv(0x18, natural)]
///     content_type: Option<u64>,
///     #[tlv(0x19, time)]
///     freshness: Option<Duration>,
/// }
/// ```
#[proc_macro_derive(TlvModel, attributes(tlv))]
pub fn derive_tlv_model(input: TokenStream) -> TokenStream {
    expand::expand(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
