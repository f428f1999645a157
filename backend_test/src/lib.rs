use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Run an async test against a freshly launched server over its own
/// throwaway database file, injecting dependencies from the signature.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// the `Db` connection guard. `#[backend_test(admin)]` logs the client in
/// with the seeded admin credentials first; `#[backend_test(participant)]`
/// registers a participant and so starts with a survey session.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Work out which dependencies the signature asks for.
    let (test_args, wants_db) = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Free up the original name for the generated wrapper.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Take a pool connection handle only if the test asked for one.
    let maybe_db = wants_db
        .then(|| {
            quote! {
                let db = crate::model::sqlite::Db::get_one(rocket_client.rocket())
                    .await
                    .unwrap();
            }
        })
        .unwrap_or_default();

    // Log the client in as an admin, or register it as a participant. Only
    // the copied status is bound: a bound response would keep the client
    // borrowed past its move into the test body.
    let maybe_login = parse_macro_input!(args as Option<Ident>)
        .and_then(|arg| {
            if arg == "admin" {
                Some(quote! {
                    let status = rocket_client
                        .post("/admin")
                        .header(rocket::http::ContentType::Form)
                        .body(format!(
                            "username={}&password={}",
                            crate::model::admin::DEFAULT_ADMIN_USERNAME,
                            crate::model::admin::DEFAULT_ADMIN_PASSWORD,
                        ))
                        .dispatch()
                        .await
                        .status();
                    assert_eq!(status, rocket::http::Status::SeeOther);
                })
            } else if arg == "participant" {
                Some(quote! {
                    let status = rocket_client
                        .post("/participants")
                        .header(rocket::http::ContentType::JSON)
                        .body(
                            rocket::serde::json::json!({
                                "name": "Kim",
                                "age": 25,
                                "gender": "F",
                            })
                            .to_string(),
                        )
                        .dispatch()
                        .await
                        .status();
                    assert_eq!(status, rocket::http::Status::Ok);
                })
            } else {
                None
            }
        })
        .unwrap_or_default();

    // Rewrite the test function. The database file is declared first so it
    // outlives (and is deleted after) everything using it.
    quote! {
        #[rocket::async_test]
        async fn #name() {
            let db_file = ::tempfile::Builder::new()
                .prefix("survey-test")
                .suffix(".sqlite")
                .tempfile()
                .unwrap();
            let rocket_client = rocket::local::asynchronous::Client::tracked(
                crate::test_rocket(db_file.path()),
            )
            .await
            .unwrap();

            #maybe_db
            #maybe_login

            /// The wrapped test body.
            #item_fn

            #new_name(#(#test_args),*).await;
        }
    }
    .into()
}

/// Validate the test signature and map each parameter onto an injected local.
fn check_sig(sig: Signature) -> Result<(Vec<TokenStream2>, bool), syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test function must be `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                if let Type::Path(type_path) = &*pat_type.ty {
                    if let Some(type_ident) = type_path.path.get_ident() {
                        if type_ident == "Client" {
                            if has_client {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test takes at most one `Client`",
                                ));
                            }
                            has_client = true;
                            args.push(quote! { rocket_client });
                            continue;
                        } else if type_ident == "Db" {
                            if has_db {
                                return Err(syn::Error::new(
                                    input.span(),
                                    "Test takes at most one `Db` handle",
                                ));
                            }
                            has_db = true;
                            args.push(quote! { db });
                            continue;
                        }
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `db_ident: Db`",
        ));
    }

    Ok((args, has_db))
}
