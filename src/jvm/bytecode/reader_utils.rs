use std::io::{self, Read, Write};

pub(crate) trait BytecodeReader {
    fn decode_value<T: Readable>(&mut self) -> io::Result<T>;
}

pub(crate) trait Readable: Sized {
    fn read_from_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self>;
}

impl<R: Read + ?Sized> BytecodeReader for R {
    fn decode_value<T: Readable>(&mut self) -> io::Result<T> {
        T::read_from_reader(self)
    }
}

impl<const N: usize> Readable for [u8; N] {
    fn read_from_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; N];
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

macro_rules! impl_readable_for {
    ($($t:ty),*) => {
        $(
            impl Readable for $t {
                fn read_from_reader<R: Read + ?Sized>(reader: &mut R) -> io::Result<Self> {
                    let buf = reader.decode_value()?;
                    Ok(Self::from_be_bytes(buf))
                }
            }
        )*
    };
}

impl_readable_for!(u8, u16, u32, i8, i16, i32, i64, f32, f64);

/// Reads `len` bytes and advances the reader by `len` bytes.
pub(crate) fn read_byte_chunk<R>(reader: &mut R, len: usize) -> io::Result<Vec<u8>>
where
    R: Read + ?Sized,
{
    let mut buf = vec![0u8; len];
    reader.read_exact(buf.as_mut_slice())?;
    Ok(buf)
}

/// Counts the bytes passing through a reader or a writer, which is what switch padding is
/// aligned against.
#[derive(Debug)]
pub(crate) struct PositionTracker<T> {
    inner: T,
    position: usize,
}

impl<T> PositionTracker<T> {
    pub(crate) const fn new(inner: T) -> Self {
        Self { inner, position: 0 }
    }

    pub(crate) const fn position(&self) -> usize {
        self.position
    }
}

impl<R: Read> Read for PositionTracker<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n;
        Ok(n)
    }
}

impl<W: Write> Write for PositionTracker<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.position += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
