use crate::constants::NUM_FILE_STREAMS;
use std::fs::File;
use std::io::{self, Read, Write};

/// Host I/O multiplexer for the simulator.
///
/// Stream values below 256 select the processor's standard input and output
/// sinks. Larger values select one of eight file streams, index
/// `(stream >> 8) & 7`, backed by `simin<i>` for input and `simout<i>` for
/// output. Files are opened on first use and belong to this instance, so
/// simulators can be constructed and dropped freely within one process.
pub struct SimIo {
    input: Box<dyn Read>,
    output: Box<dyn Write>,
    in_files: Vec<Option<File>>,
    out_files: Vec<Option<File>>,
}

impl SimIo {
    /// Multiplexer over the process stdin/stdout.
    pub fn new() -> SimIo {
        SimIo::with_streams(Box::new(io::stdin()), Box::new(io::stdout()))
    }

    /// Multiplexer over caller-supplied sinks, used by tests and by tools
    /// that capture guest output.
    pub fn with_streams(input: Box<dyn Read>, output: Box<dyn Write>) -> SimIo {
        SimIo {
            input,
            output,
            in_files: (0..NUM_FILE_STREAMS).map(|_| None).collect(),
            out_files: (0..NUM_FILE_STREAMS).map(|_| None).collect(),
        }
    }

    fn stream_index(stream: u32) -> usize {
        ((stream >> 8) & 7) as usize
    }

    /// Output one byte to the selected stream.
    pub fn output(&mut self, value: u8, stream: u32) -> io::Result<()> {
        if stream < 256 {
            self.output.write_all(&[value])
        } else {
            let index = SimIo::stream_index(stream);
            if self.out_files[index].is_none() {
                self.out_files[index] = Some(File::create(format!("simout{}", index))?);
            }
            self.out_files[index].as_mut().unwrap().write_all(&[value])
        }
    }

    /// Input one byte from the selected stream. Returns -1 at end of file.
    pub fn input(&mut self, stream: u32) -> io::Result<i32> {
        if stream < 256 {
            read_byte(&mut self.input)
        } else {
            let index = SimIo::stream_index(stream);
            if self.in_files[index].is_none() {
                self.in_files[index] = Some(File::open(format!("simin{}", index))?);
            }
            read_byte(self.in_files[index].as_mut().unwrap())
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

fn read_byte(reader: &mut dyn Read) -> io::Result<i32> {
    let mut buffer = [0u8; 1];
    match reader.read(&mut buffer)? {
        0 => Ok(-1),
        _ => Ok(i32::from(buffer[0])),
    }
}
