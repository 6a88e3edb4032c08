//! Procedural macros for testkit-eventually
//!
//! This crate provides the `#[testkit_eventually::test]` attribute macro for
//! writing async tests that receive a ready-made assertion harness.
//!
//! # Example
//!
//! ```rust,ignore
//! use testkit_eventually::prelude::*;
//!
//! #[testkit_eventually::test(start_paused = true)]
//! async fn my_test(harness: Harness) {
//!     harness.eventually(Actual::value(1)).should(eq(1)).await;
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input, FnArg, Ident, ItemFn, Lit, Pat, Token, Type,
};

/// Configuration options for the test macro.
#[derive(Default)]
struct TestConfig {
    /// Whether to start tokio's clock paused (default: false)
    start_paused: bool,
    /// Flavor for tokio runtime ("current_thread" or "multi_thread")
    flavor: Option<String>,
}

impl Parse for TestConfig {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut config = TestConfig::default();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "start_paused" => match input.parse::<Lit>()? {
                    Lit::Bool(b) => config.start_paused = b.value(),
                    other => {
                        return Err(syn::Error::new_spanned(other, "start_paused expects a bool"))
                    }
                },
                "flavor" => match input.parse::<Lit>()? {
                    Lit::Str(s) => config.flavor = Some(s.value()),
                    other => return Err(syn::Error::new_spanned(other, "flavor expects a string")),
                },
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {ident}"),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(config)
    }
}

/// Determines if a function parameter is requesting a Harness.
fn is_harness_param(arg: &FnArg) -> bool {
    if let FnArg::Typed(pat_type) = arg {
        if let Type::Path(type_path) = &*pat_type.ty {
            if let Some(segment) = type_path.path.segments.last() {
                return segment.ident == "Harness";
            }
        }
    }
    false
}

/// Extracts the parameter name from a function argument.
fn get_param_name(arg: &FnArg) -> Option<&Pat> {
    if let FnArg::Typed(pat_type) = arg {
        Some(&pat_type.pat)
    } else {
        None
    }
}

/// Test attribute macro for async tests with an assertion harness.
///
/// The test runs on tokio. A parameter of type `Harness` receives a harness
/// whose fail handler panics, so a failed assertion fails the test.
///
/// # Basic Usage
///
/// ```rust,ignore
/// use testkit_eventually::prelude::*;
///
/// #[testkit_eventually::test]
/// async fn test_basic(harness: Harness) {
///     harness.expect(2 + 2).to(eq(4));
/// }
/// ```
///
/// # Configuration Options
///
/// - `start_paused = true` - Start tokio's clock paused, so polling runs on
///   virtual time
/// - `flavor = "multi_thread"` - Tokio runtime flavor
///
/// ```rust,ignore
/// #[testkit_eventually::test(start_paused = true)]
/// async fn test_paused(harness: Harness) {
///     harness
///         .consistently(Actual::value(1))
///         .within(Duration::from_secs(60))
///         .should(eq(1))
///         .await;
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let config = parse_macro_input!(attr as TestConfig);
    let input = parse_macro_input!(item as ItemFn);

    expand_test(&config, &input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_test(config: &TestConfig, input: &ItemFn) -> syn::Result<TokenStream2> {
    let name = &input.sig.ident;
    let body = &input.block;
    let attrs = &input.attrs;
    let vis = &input.vis;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input.sig,
            "test function must be async",
        ));
    }

    if let Some(other) = input.sig.inputs.iter().find(|arg| !is_harness_param(arg)) {
        return Err(syn::Error::new_spanned(
            other,
            "test parameters must be of type Harness",
        ));
    }

    let harness_init = input
        .sig
        .inputs
        .iter()
        .filter_map(get_param_name)
        .map(|harness_name| {
            quote! {
                let #harness_name = ::testkit_eventually::Harness::new(
                    ::testkit_eventually::PanicFailHandler
                );
            }
        });

    let flavor = config.flavor.as_deref().unwrap_or("current_thread");
    let runtime_attr = match (flavor, config.start_paused) {
        ("current_thread", false) => quote! { #[::tokio::test] },
        ("current_thread", true) => quote! { #[::tokio::test(start_paused = true)] },
        ("multi_thread", false) => quote! { #[::tokio::test(flavor = "multi_thread")] },
        ("multi_thread", true) => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                "start_paused requires the current_thread flavor",
            ));
        }
        (other, _) => {
            return Err(syn::Error::new(
                proc_macro2::Span::call_site(),
                format!("unsupported flavor: {other}. Use \"current_thread\" or \"multi_thread\""),
            ));
        }
    };

    Ok(quote! {
        #runtime_attr
        #(#attrs)*
        #vis async fn #name() {
            #(#harness_init)*
            #body
        }
    })
}
