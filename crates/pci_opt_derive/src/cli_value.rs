use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, LitStr, parse_macro_input, spanned::Spanned};

use crate::utils;

/// One unit variant with its canonical spelling and accepted aliases.
struct ValueVariant {
    ident: Ident,
    canonical: String,
    aliases: Vec<String>,
}

impl ValueVariant {
    fn parse(ident: Ident, attrs: &[Attribute]) -> syn::Result<Self> {
        let mut canonical = utils::to_kebab_case(&ident.to_string());
        let mut aliases = Vec::new();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("cli")) {
            attr.parse_nested_meta(|meta| {
                let lit: LitStr = meta.value()?.parse()?;
                if meta.path.is_ident("name") {
                    canonical = lit.value();
                } else if meta.path.is_ident("alias") {
                    aliases.push(lit.value());
                } else {
                    return Err(meta.error("unsupported cli attribute; expected name/alias"));
                }
                Ok(())
            })?;
        }
        Ok(Self {
            ident,
            canonical,
            aliases,
        })
    }
}

fn option_name(input: &DeriveInput) -> syn::Result<String> {
    let mut name = utils::to_kebab_case(&input.ident.to_string());
    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("cli_value")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident("option") {
                return Err(meta.error("unsupported cli_value attribute; expected option = \"...\""));
            }
            name = meta.value()?.parse::<LitStr>()?.value();
            Ok(())
        })?;
    }
    Ok(name)
}

pub fn derive_cli_value_inner(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let Data::Enum(data_enum) = &input.data else {
        return Err(syn::Error::new(input.span(), "CliValue can only be derived for enums"));
    };
    let option = option_name(input)?;

    let mut variants = Vec::with_capacity(data_enum.variants.len());
    for variant in &data_enum.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new(
                variant.span(),
                "CliValue only supports enums with unit variants",
            ));
        }
        variants.push(ValueVariant::parse(variant.ident.clone(), &variant.attrs)?);
    }

    let enum_ident = &input.ident;
    let canonicals: Vec<&str> = variants.iter().map(|v| v.canonical.as_str()).collect();
    let parse_arms = variants.iter().map(|v| {
        let ident = &v.ident;
        let spellings = std::iter::once(&v.canonical).chain(&v.aliases);
        quote! { #(#spellings)|* => Ok(Self::#ident), }
    });
    let display_arms = variants.iter().map(|v| {
        let ident = &v.ident;
        let canonical = &v.canonical;
        quote! { Self::#ident => #canonical, }
    });

    Ok(quote! {
        impl #enum_ident {
            /// Canonical spellings accepted by `parse`, in declaration order.
            pub const VALUES: &'static [&'static str] = &[#(#canonicals),*];

            pub fn parse(raw: &str) -> crate::Result<Self> {
                match raw.to_ascii_lowercase().as_str() {
                    #(#parse_arms)*
                    _ => Err(crate::Error::invalid_input(format!(
                        "Invalid value for --{}: {} (expected {})",
                        #option,
                        raw,
                        Self::VALUES.join("|")
                    ))),
                }
            }
        }

        impl std::fmt::Display for #enum_ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(match self {
                    #(#display_arms)*
                })
            }
        }
    })
}
