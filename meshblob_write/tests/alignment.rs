use meshblob_write::MeshWrite;

#[test]
fn struct_derive_uses_align_of() {
    #[derive(Debug, Default, MeshWrite)]
    struct TestStruct {
        x: u8,
        y: u16,
    }

    assert_eq!(
        std::mem::align_of::<TestStruct>(),
        TestStruct::alignment_in_bytes() as usize
    );
}

#[test]
fn alignment_attribute() {
    #[derive(Debug, Default, MeshWrite)]
    #[meshwrite(alignment = 16)]
    struct TestStruct {
        x: u8,
        y: u16,
    }

    assert_eq!(16, TestStruct::alignment_in_bytes());
}

#[test]
fn vec_uses_element_alignment() {
    #[derive(Debug, Default, MeshWrite)]
    struct TestStruct {
        x: u32,
    }

    assert_eq!(4, Vec::<TestStruct>::alignment_in_bytes());
}
