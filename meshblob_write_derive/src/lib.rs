extern crate proc_macro;

use crate::proc_macro::TokenStream;

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;

use syn::{
    parse_macro_input, Attribute, Data, DataStruct, DeriveInput, Fields, Ident, Index, Lit,
    Member, Meta, MetaNameValue, NestedMeta,
};

#[derive(Default)]
struct WriteOptions {
    repr: Option<Ident>,
    alignment: Option<u64>,
}

fn parse_write_options(attrs: &[Attribute]) -> WriteOptions {
    let mut options = WriteOptions::default();

    for attr in attrs.iter().filter(|a| a.path.is_ident("meshwrite")) {
        if let Ok(Meta::List(list)) = attr.parse_meta() {
            for nested in list.nested {
                match nested {
                    // #[meshwrite(repr(u32))]
                    NestedMeta::Meta(Meta::List(inner)) if inner.path.is_ident("repr") => {
                        if let Some(NestedMeta::Meta(Meta::Path(path))) = inner.nested.first() {
                            options.repr = path.get_ident().cloned();
                        }
                    }
                    // #[meshwrite(alignment = 8)]
                    NestedMeta::Meta(Meta::NameValue(MetaNameValue {
                        path,
                        lit: Lit::Int(value),
                        ..
                    })) if path.is_ident("alignment") => {
                        options.alignment = value.base10_parse::<u64>().ok();
                    }
                    _ => (),
                }
            }
        }
    }

    options
}

#[proc_macro_derive(MeshWrite, attributes(meshwrite))]
pub fn mesh_write_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let options = parse_write_options(&input.attrs);

    let implementing_type = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (write_code, size_code, alignment_code) = match &input.data {
        Data::Struct(DataStruct { fields, .. }) => struct_write_code(fields, &options),
        Data::Enum(_) => match &options.repr {
            Some(repr) => enum_write_code(repr),
            None => panic!("enums require #[meshwrite(repr(<integer type>))]"),
        },
        Data::Union(_) => panic!("unions are not supported"),
    };

    let expanded = quote! {
        impl #impl_generics meshblob_write::MeshWrite for #implementing_type #ty_generics #where_clause {
            fn mesh_write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
                #write_code
                Ok(())
            }

            fn size_in_bytes(&self) -> u64 {
                #size_code
            }

            fn alignment_in_bytes() -> u64 {
                #alignment_code
            }
        }
    };

    TokenStream::from(expanded)
}

fn struct_write_code(
    fields: &Fields,
    options: &WriteOptions,
) -> (TokenStream2, TokenStream2, TokenStream2) {
    // Fields are written in declaration order without any implicit padding.
    let members: Vec<Member> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| match &field.ident {
            Some(ident) => Member::Named(ident.clone()),
            None => Member::Unnamed(Index::from(i)),
        })
        .collect();

    let write_code = quote! {
        #(
            meshblob_write::MeshWrite::mesh_write(&self.#members, writer)?;
        )*
    };

    let size_code = quote! {
        0u64 #(+ meshblob_write::MeshWrite::size_in_bytes(&self.#members))*
    };

    let alignment_code = match options.alignment {
        Some(alignment) => quote! { #alignment },
        None => quote! { std::mem::align_of::<Self>() as u64 },
    };

    (write_code, size_code, alignment_code)
}

fn enum_write_code(repr: &Ident) -> (TokenStream2, TokenStream2, TokenStream2) {
    let write_code = quote! {
        meshblob_write::MeshWrite::mesh_write(&(*self as #repr), writer)?;
    };
    let size_code = quote! { std::mem::size_of::<#repr>() as u64 };
    let alignment_code = quote! { std::mem::align_of::<#repr>() as u64 };

    (write_code, size_code, alignment_code)
}
