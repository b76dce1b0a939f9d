//! `#[contract]`: turns a trait into a mockable contract.
//!
//! For `trait Greeter` the attribute keeps the trait as written and adds
//! `GreeterOp` (one token per operation), `GreeterMock` (the forwarding
//! type every `Mock<dyn Greeter>` hands out) and
//! `impl dummy_mock::Contract for dyn Greeter`.

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{parse_macro_input, FnArg, ItemTrait, ReturnType, Signature, TraitItem};

#[proc_macro_attribute]
pub fn contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    let item_trait = parse_macro_input!(item as ItemTrait);
    let attr = TokenStream2::from(attr);

    match expand(attr, &item_trait) {
        Ok(output) => output.into(),
        Err(error) => {
            let error = error.to_compile_error();
            quote! {
                #item_trait
                #error
            }
            .into()
        }
    }
}

struct OperationInfo {
    signature: Signature,
    name: String,
    variant: syn::Ident,
    parameters: Vec<(String, String)>,
    return_type: Option<String>,
}

fn expand(attr: TokenStream2, item_trait: &ItemTrait) -> syn::Result<TokenStream2> {
    if !attr.is_empty() {
        return Err(syn::Error::new_spanned(
            attr,
            "#[contract] does not take arguments",
        ));
    }
    if !item_trait.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item_trait.generics,
            "contract traits cannot be generic",
        ));
    }

    let operations = collect_operations(item_trait)?;

    let vis = &item_trait.vis;
    let trait_ident = &item_trait.ident;
    // Descriptor name keeps a raw prefix so keywords stay valid identifiers
    let contract_name = trait_ident.to_string();
    let trait_name = trait_ident.unraw().to_string();
    let op_ident = format_ident!("{}Op", trait_name);
    let mock_ident = format_ident!("{}Mock", trait_name);

    let variants: Vec<_> = operations.iter().map(|op| &op.variant).collect();
    let names: Vec<_> = operations.iter().map(|op| &op.name).collect();

    let methods = operations.iter().map(|op| {
        let signature = &op.signature;
        let name = &op.name;
        let return_type = match &signature.output {
            ReturnType::Default => quote!(()),
            ReturnType::Type(_, ty) => quote!(#ty),
        };
        quote! {
            #signature {
                self.handle.dispatch::<#return_type>(#name)
            }
        }
    });

    let declarations = operations.iter().map(|op| {
        let name = &op.name;
        let parameters = op.parameters.iter().map(|(name, ty)| quote!((#name, #ty)));
        let return_type = match &op.return_type {
            Some(ty) => quote!(::std::option::Option::Some(#ty)),
            None => quote!(::std::option::Option::None),
        };
        quote! {
            .operation(#name, &[#(#parameters),*], #return_type)
        }
    });

    let doc_op = format!("Operations of [`{trait_name}`], used to address setups.");
    let doc_mock = format!("Forwarding implementation of [`{trait_name}`] backed by a mock registry.");

    Ok(quote! {
        #item_trait

        #[doc = #doc_op]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #vis enum #op_ident {
            #(#variants),*
        }

        impl ::dummy_mock::OperationToken for #op_ident {
            fn name(&self) -> &'static str {
                match *self {
                    #(#op_ident::#variants => #names,)*
                }
            }
        }

        #[doc = #doc_mock]
        #vis struct #mock_ident {
            handle: ::dummy_mock::MockHandle,
        }

        impl #mock_ident {
            pub fn handle(&self) -> &::dummy_mock::MockHandle {
                &self.handle
            }
        }

        #[allow(unused_variables)]
        impl #trait_ident for #mock_ident {
            #(#methods)*
        }

        impl ::dummy_mock::Contract for dyn #trait_ident {
            type Op = #op_ident;
            type Object = #mock_ident;

            fn descriptor() -> ::dummy_mock::ContractDescriptor {
                ::dummy_mock::ContractDescriptor::builder(#contract_name)
                    .module_path(::std::module_path!())
                    #(#declarations)*
                    .build()
            }

            fn instantiate(handle: ::dummy_mock::MockHandle) -> Self::Object {
                #mock_ident { handle }
            }
        }
    })
}

fn collect_operations(item_trait: &ItemTrait) -> syn::Result<Vec<OperationInfo>> {
    let mut operations = Vec::new();

    for item in &item_trait.items {
        let method = match item {
            TraitItem::Fn(method) => method,
            TraitItem::Type(item) => {
                return Err(syn::Error::new_spanned(
                    item,
                    "associated types are not supported in contracts",
                ))
            }
            TraitItem::Const(item) => {
                return Err(syn::Error::new_spanned(
                    item,
                    "associated consts are not supported in contracts",
                ))
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported item in contract",
                ))
            }
        };
        let signature = &method.sig;

        let Some(receiver) = signature.receiver() else {
            // Static members are not part of the mockable surface
            if method.default.is_some() {
                continue;
            }
            return Err(syn::Error::new_spanned(
                signature,
                "operations without a receiver need a default body",
            ));
        };
        if receiver.reference.is_none()
            || receiver.mutability.is_some()
            || receiver.colon_token.is_some()
        {
            return Err(syn::Error::new_spanned(
                receiver,
                "mockable operations take `&self`",
            ));
        }
        if let Some(asyncness) = &signature.asyncness {
            return Err(syn::Error::new_spanned(
                asyncness,
                "async fn is not supported in contracts; return a BoxFuture instead",
            ));
        }
        if !signature.generics.params.is_empty() {
            return Err(syn::Error::new_spanned(
                &signature.generics,
                "generic operations are not supported in contracts",
            ));
        }

        let parameters = signature
            .inputs
            .iter()
            .filter_map(|input| match input {
                FnArg::Typed(typed) => {
                    let pat = &typed.pat;
                    let ty = &typed.ty;
                    Some((quote!(#pat).to_string(), quote!(#ty).to_string()))
                }
                FnArg::Receiver(_) => None,
            })
            .collect();
        let return_type = match &signature.output {
            ReturnType::Default => None,
            ReturnType::Type(_, ty) => Some(quote!(#ty).to_string()),
        };

        operations.push(OperationInfo {
            signature: signature.clone(),
            name: signature.ident.to_string(),
            variant: format_ident!("{}", pascal_case(&signature.ident.unraw().to_string())),
            parameters,
            return_type,
        });
    }

    Ok(operations)
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(source: &str) -> syn::Result<String> {
        let item_trait: ItemTrait = syn::parse_str(source)?;
        expand(TokenStream2::new(), &item_trait).map(|tokens| tokens.to_string())
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("get_greeting"), "GetGreeting");
        assert_eq!(pascal_case("notify"), "Notify");
        assert_eq!(pascal_case("_private__name"), "PrivateName");
    }

    #[test]
    fn test_expand_generates_tokens_forwarder_and_contract() {
        let output = expand_str(
            r#"
            pub trait Greeter: Send + Sync {
                fn get_greeting(&self) -> String;
                fn process(&self, x: i32) -> i32;
                fn notify(&self);
                fn version() -> u32 where Self: Sized { 1 }
            }
            "#,
        )
        .unwrap();

        assert!(output.contains("pub enum GreeterOp"));
        assert!(output.contains("GetGreeting"));
        assert!(output.contains("pub struct GreeterMock"));
        assert!(output.contains("impl Greeter for GreeterMock"));
        assert!(output.contains("impl :: dummy_mock :: Contract for dyn Greeter"));
        assert!(output.contains("dispatch :: < i32 > (\"process\")"));
        assert!(output.contains("dispatch :: < () > (\"notify\")"));
        assert!(!output.contains("\"version\""));
    }

    #[test]
    fn test_raw_trait_name_is_kept_in_descriptor() {
        let output = expand_str("pub trait r#type { fn kind(&self) -> u8; }").unwrap();

        assert!(output.contains("builder (\"r#type\")"));
        assert!(output.contains("pub struct typeMock"));
        assert!(output.contains("pub enum typeOp"));
    }

    #[test]
    fn test_generic_trait_is_rejected() {
        let error = expand_str("trait Store<T> { fn get(&self) -> T; }").unwrap_err();
        assert!(error.to_string().contains("cannot be generic"));
    }

    #[test]
    fn test_mut_receiver_is_rejected() {
        let error = expand_str("trait Counter { fn bump(&mut self); }").unwrap_err();
        assert!(error.to_string().contains("&self"));
    }

    #[test]
    fn test_async_fn_is_rejected() {
        let error = expand_str("trait Job { async fn run(&self); }").unwrap_err();
        assert!(error.to_string().contains("BoxFuture"));
    }

    #[test]
    fn test_associated_type_is_rejected() {
        let error = expand_str("trait Source { type Item; fn next(&self) -> u8; }").unwrap_err();
        assert!(error.to_string().contains("associated types"));
    }
}
