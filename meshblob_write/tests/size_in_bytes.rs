use meshblob_write::MeshWrite;

#[test]
fn struct_size_ignores_rust_padding() {
    #[derive(Debug, Default, MeshWrite)]
    struct TestStruct {
        x: u8,
        y: u16,
    }

    assert_eq!(3, TestStruct::default().size_in_bytes());
    assert_eq!(3, TestStruct::default().to_bytes().unwrap().len());
}

#[test]
fn tuple_struct_size() {
    #[derive(Debug, Default, MeshWrite)]
    struct TestStruct(u32, [f32; 3]);

    assert_eq!(16, TestStruct::default().size_in_bytes());
}

#[test]
fn vec_and_slice_size() {
    #[derive(Debug, Default, MeshWrite, Clone)]
    struct TestStruct {
        x: u8,
        y: u16,
    }

    assert_eq!(3 * 5, vec![TestStruct::default(); 5].size_in_bytes());
    assert_eq!(
        3 * 5,
        vec![TestStruct::default(); 5].as_slice().size_in_bytes()
    );
}

#[test]
fn array_size() {
    #[derive(Debug, Default, MeshWrite, Clone, Copy)]
    struct TestStruct {
        x: u8,
        y: u16,
    }

    assert_eq!(3 * 7, [TestStruct::default(); 7].size_in_bytes());
}
