use super::*;

#[test]
fn round_trip_without_debug() {
    let program = Program::from(vec![0x96, 0, 0, 0, 16, 0, 0, 0], Vec::new());
    let mut buffer = Vec::new();
    buffer.write_hex(&program).unwrap();
    assert_eq!(buffer.len(), 12);
    assert_eq!(&buffer[..4], &[2, 0, 0, 0]);
    let read_back = Cursor::new(buffer).read_hex().unwrap();
    assert_eq!(read_back, program);
}

#[test]
fn round_trip_with_debug() {
    let symbols = vec![Symbol::new("main".to_owned(), 8), Symbol::new("fib".to_owned(), 20)];
    let program = Program::from(vec![0; 24], symbols);
    let mut buffer = Vec::new();
    buffer.write_hex(&program).unwrap();
    let read_back = Cursor::new(buffer).read_hex().unwrap();
    assert_eq!(read_back, program);
    assert_eq!(read_back.symbols()[1].name, "fib");
    assert_eq!(read_back.symbols()[1].byte_offset, 20);
}

#[test]
fn truncated_file_is_an_error() {
    let program = Program::from(vec![0; 8], Vec::new());
    let mut buffer = Vec::new();
    buffer.write_hex(&program).unwrap();
    buffer.truncate(6);
    assert!(Cursor::new(buffer).read_hex().is_err());
}

#[test]
#[should_panic]
fn unaligned_program_is_rejected() {
    Program::from(vec![0; 3], Vec::new());
}
