use meshblob_write::MeshWrite;

#[test]
fn repr_u32() {
    #[derive(Debug, MeshWrite, Clone, Copy)]
    #[meshwrite(repr(u32))]
    enum TestEnum {
        A = 1,
        B = 2,
    }

    let mut writer = Vec::new();
    TestEnum::A.mesh_write(&mut writer).unwrap();
    TestEnum::B.mesh_write(&mut writer).unwrap();

    assert_eq!(vec![1u8, 0u8, 0u8, 0u8, 2u8, 0u8, 0u8, 0u8], writer);
    assert_eq!(4, TestEnum::A.size_in_bytes());
    assert_eq!(
        std::mem::align_of::<u32>(),
        TestEnum::alignment_in_bytes() as usize
    );
}

#[test]
fn repr_u16() {
    #[derive(Debug, MeshWrite, Clone, Copy)]
    #[meshwrite(repr(u16))]
    enum TestEnum {
        A = 0x0102,
    }

    assert_eq!(vec![2u8, 1u8], TestEnum::A.to_bytes().unwrap());
}
