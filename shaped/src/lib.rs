extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DataEnum, DataStruct, DeriveInput, Fields, Type};

/// Returns the single generic argument of `Option<T>` / `Vec<T>`, if `ty` is one.
fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_path(ty: &Type, name: &str) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            return segment.ident == name && segment.arguments.is_none();
        }
    }
    false
}

/// Maps a field type to the expression building its `TypeRef`. Primitives map syntactically,
/// anything else defers to the type's own `Shaped` impl.
fn type_ref_expr(ty: &Type) -> TokenStream2 {
    if is_path(ty, "bool") {
        return quote! { ::mutatools::TypeRef::boolean() };
    }
    for (name, width) in
        [("i8", "I8"), ("i16", "I16"), ("i32", "I32"), ("i64", "I64")]
    {
        if is_path(ty, name) {
            let width = syn::Ident::new(width, proc_macro2::Span::call_site());
            return quote! { ::mutatools::TypeRef::int(::mutatools::IntWidth::#width) };
        }
    }
    for (name, width) in [("f32", "F32"), ("f64", "F64")] {
        if is_path(ty, name) {
            let width = syn::Ident::new(width, proc_macro2::Span::call_site());
            return quote! { ::mutatools::TypeRef::float(::mutatools::FloatWidth::#width) };
        }
    }
    if is_path(ty, "String") {
        return quote! { ::mutatools::TypeRef::text() };
    }
    if let Some(inner) = generic_arg(ty, "Option") {
        let inner = type_ref_expr(inner);
        return quote! { ::mutatools::TypeRef::optional(#inner) };
    }
    if let Some(inner) = generic_arg(ty, "Vec") {
        if is_path(inner, "u8") {
            return quote! { ::mutatools::TypeRef::bytes() };
        }
        let inner = type_ref_expr(inner);
        return quote! { ::mutatools::TypeRef::sequence(#inner) };
    }
    quote! { <#ty as ::mutatools::Shaped>::type_ref() }
}

/// Derives `mutatools::Shaped`: a struct becomes a record over its fields, an enum becomes a
/// variant over its arms (unit arms map to the unit type, single-field arms to the field's
/// type).
#[proc_macro_derive(Shaped)]
pub fn shaped_derive(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let id = &input.ident;
    let name = id.to_string();

    let body = match &input.data {
        Data::Struct(DataStruct { fields, .. }) => {
            let entries = fields.iter().enumerate().map(|(i, field)| {
                let field_name = field
                    .ident
                    .as_ref()
                    .map(|ident| ident.to_string())
                    .unwrap_or_else(|| i.to_string());
                let field_ty = type_ref_expr(&field.ty);
                quote! { (#field_name.to_owned(), #field_ty) }
            });
            quote! {
                ::mutatools::TypeRef::record(#name, vec![ #(#entries),* ])
            }
        }
        Data::Enum(DataEnum { variants, .. }) => {
            let arms = variants.iter().map(|variant| {
                let arm_name = variant.ident.to_string();
                let arm_ty = match &variant.fields {
                    Fields::Unit => quote! { ::mutatools::TypeRef::unit() },
                    Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
                        type_ref_expr(&fields.unnamed[0].ty)
                    }
                    _ => {
                        return syn::Error::new_spanned(
                            variant,
                            "Shaped enum variants must be unit or single-field",
                        )
                        .to_compile_error();
                    }
                };
                quote! { (#arm_name.to_owned(), #arm_ty) }
            });
            quote! {
                ::mutatools::TypeRef::variant(#name, vec![ #(#arms),* ])
            }
        }
        Data::Union(_) => {
            return syn::Error::new_spanned(&input.ident, "Shaped can not be derived for unions")
                .to_compile_error()
                .into();
        }
    };

    quote! {
        #[automatically_derived]
        impl ::mutatools::Shaped for #id {
            fn type_ref() -> ::mutatools::TypeRef {
                #body
            }
        }
    }
    .into()
}
