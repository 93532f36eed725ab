use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

/// How one field is rendered after its `key = ` prefix.
enum Render {
    Display,
    Debug,
    /// Display, or the given placeholder when the string is empty.
    OrEmpty(String),
}

struct KvField<'a> {
    ident: &'a Ident,
    key: String,
    render: Render,
}

impl<'a> KvField<'a> {
    fn from_field(field: &'a Field) -> syn::Result<Option<Self>> {
        let Some(ident) = &field.ident else {
            return Ok(None);
        };
        let mut key = ident.to_string();
        let mut render = Render::Display;

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("kv")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    key = meta.value()?.parse::<LitStr>()?.value();
                } else if meta.path.is_ident("fmt") {
                    let mode: LitStr = meta.value()?.parse()?;
                    render = match mode.value().as_str() {
                        "display" => Render::Display,
                        "debug" => Render::Debug,
                        other => {
                            return Err(syn::Error::new(
                                mode.span(),
                                format!("unsupported kv fmt mode: {other}"),
                            ));
                        }
                    };
                } else if meta.path.is_ident("empty") {
                    render = Render::OrEmpty(meta.value()?.parse::<LitStr>()?.value());
                } else {
                    return Err(meta.error("unsupported kv attribute; expected name/fmt/empty"));
                }
                Ok(())
            })?;
        }

        Ok(Some(Self { ident, key, render }))
    }

    fn value_tokens(&self) -> proc_macro2::TokenStream {
        let ident = self.ident;
        match &self.render {
            Render::Display => quote! { self.#ident.to_string() },
            Render::Debug => quote! { format!("{:?}", self.#ident) },
            Render::OrEmpty(placeholder) => quote! {
                if self.#ident.is_empty() {
                    #placeholder.to_string()
                } else {
                    self.#ident.to_string()
                }
            },
        }
    }
}

/// `Display` as one aligned `key = value` line per field, each on its own
/// tab-indented line.
pub fn derive_kv_display_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let struct_ident = &input.ident;

    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => named,
            _ => {
                return syn::Error::new(input.span(), "KvDisplay requires named fields")
                    .to_compile_error()
                    .into();
            }
        },
        _ => {
            return syn::Error::new(input.span(), "KvDisplay can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        match KvField::from_field(field) {
            Ok(Some(kv)) => fields.push(kv),
            Ok(None) => {}
            Err(err) => return err.to_compile_error().into(),
        }
    }

    let width = fields.iter().map(|field| field.key.len()).max().unwrap_or(0);
    let lines = fields.iter().map(|field| {
        let label = LitStr::new(
            &format!("\n\t{:<width$} = ", field.key),
            proc_macro2::Span::call_site(),
        );
        let value = field.value_tokens();
        quote! {
            f.write_str(#label)?;
            f.write_str(&#value)?;
        }
    });

    let expanded = quote! {
        impl std::fmt::Display for #struct_ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                #(#lines)*
                Ok(())
            }
        }
    };

    TokenStream::from(expanded)
}
