use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type,
};

/// Transform an asynchronous test into a synchronous one and inject dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::queue::MemoryQueue`, the queue the client's server appends votes to.
/// The queue answers normally unless the attribute names another mode:
/// `#[backend_test(offline)]` or `#[backend_test(stalled)]`.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Pick the queue behaviour.
    let mode = match parse_macro_input!(args as Option<Ident>) {
        None => quote! { Online },
        Some(arg) if arg == "offline" => quote! { Offline },
        Some(arg) if arg == "stalled" => quote! { Stalled },
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected `offline` or `stalled`")
                .into_compile_error()
                .into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup(queue: crate::queue::MemoryQueue) -> rocket::local::asynchronous::Client {
                log4rs_test_utils::test_logging::init_logging_once_for(["vote_front"], None, None);
                rocket::local::asynchronous::Client::tracked(crate::rocket_for_queue(queue))
                    .await
                    .unwrap()
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            let queue = crate::queue::MemoryQueue::new(crate::queue::Mode::#mode);
            runtime.block_on(async {
                let rocket_client = setup(queue.clone()).await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, and map each parameter to the value injected for it.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_queue = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // Valid as the last path segment for any type is itself
                let type_ident = &type_path.path.segments.last().unwrap().ident;
                if type_ident == "Client" {
                    if has_client {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                        ));
                    }
                    has_client = true;
                    args.push(quote! { rocket_client });
                    continue;
                } else if type_ident == "MemoryQueue" {
                    if has_queue {
                        return Err(syn::Error::new(
                            input.span(),
                            "Test cannot accept more than one `MemoryQueue`",
                        ));
                    }
                    has_queue = true;
                    args.push(quote! { queue.clone() });
                    continue;
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `queue_ident: MemoryQueue`",
        ));
    }

    Ok(args)
}
