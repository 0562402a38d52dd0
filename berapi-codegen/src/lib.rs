use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;

/// Turns a zero-argument function into a `#[test]` that runs inside a
/// `berapi::TestSession`.
///
/// The single argument is the path of a function returning the
/// `Arc<berapi::Tracker>` used by the test. The tracker is cleared before the
/// body runs and its exchanges are printed if the body panics. `async` bodies
/// are driven by `berapi::session::block_on`.
///
/// ```ignore
/// #[berapi_test(tracker)]
/// async fn fetches_user() {
///     client().get("/users/1").send().await.unwrap().assert_2xx();
/// }
/// ```
#[proc_macro_attribute]
pub fn berapi_test(attrs: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let args = syn::parse_macro_input!(attrs as syn::AttributeArgs);

    let tracker_function = match args.as_slice() {
        [syn::NestedMeta::Meta(syn::Meta::Path(path))] => path,
        [] => {
            return compile_error(
                Span::call_site(),
                "A tracker function should be passed to the macro",
            )
        }
        [other, ..] => {
            return compile_error(
                other.span(),
                "The only argument should be the path of a tracker function!",
            )
        }
    };

    if !input.sig.inputs.is_empty() {
        return compile_error(input.sig.inputs.span(), "A berapi test cannot take arguments!");
    }

    let attributes = &input.attrs;
    let visibility = &input.vis;
    let name = &input.sig.ident;
    let output = &input.sig.output;
    let asyncness = &input.sig.asyncness;
    let block = &input.block;

    let call = if asyncness.is_some() {
        quote! { ::berapi::session::block_on(__berapi_body()) }
    } else {
        quote! { __berapi_body() }
    };

    let expanded = quote! {
        #[test]
        #(#attributes)*
        #visibility fn #name() #output {
            #asyncness fn __berapi_body() #output #block

            let __berapi_session = ::berapi::TestSession::new(#tracker_function());
            __berapi_session.run(|| #call)
        }
    };

    TokenStream::from(expanded)
}

fn compile_error(span: Span, message: &str) -> TokenStream {
    quote_spanned! {span=>
        compile_error!(#message);
    }
    .into()
}
