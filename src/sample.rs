/// Sample types which can be read and written with
/// [`WaveFile::read()`](crate::WaveFile::read) and [`WaveFile::write()`](crate::WaveFile::write).
///
/// The size of the type is the in-memory container width. It must match
/// the container width of the file's sample size, see [`container_width()`].
pub trait Sample: Copy {
    /// Container width in bytes.
    const SIZE: usize;

    /// Creates a sample from `SIZE` little-endian bytes.
    fn from_le_container(bytes: &[u8]) -> Self;

    /// Writes the sample as `SIZE` little-endian bytes to the start of `out`.
    fn write_le_container(self, out: &mut [u8]);
}

macro_rules! impl_sample {
    ($($t:ty),*) => { $(
        impl Sample for $t {
            const SIZE: usize = std::mem::size_of::<$t>();

            #[inline(always)]
            fn from_le_container(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..Self::SIZE]);
                <$t>::from_le_bytes(buf)
            }

            #[inline(always)]
            fn write_le_container(self, out: &mut [u8]) {
                out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }
        }
    )* };
}

impl_sample!(u8, i8, i16, i32, i64, f32, f64);

/// Returns the in-memory container width for the sample byte width.
///
/// The container width is the smallest power of two which can hold the sample:
/// 1 and 2 byte samples are kept as is, 3 byte samples use 4 byte containers and
/// 5 to 8 byte samples use 8 byte containers.
///
/// # Examples
///
/// ```
/// assert_eq!(wavefile::container_width(3), 4);
/// assert_eq!(wavefile::container_width(8), 8);
/// ```
pub fn container_width(sample_size: usize) -> usize {
    if sample_size == 0 {
        return 0;
    }
    sample_size.next_power_of_two()
}

/// Copies `raw` to the start of `container` and fills the remaining bytes.
/// If `sign_extend` is true and the sign bit of `raw` is set, the remaining
/// bytes are filled with 0xff, otherwise with zeros.
#[inline(always)]
pub(crate) fn widen(raw: &[u8], container: &mut [u8], sign_extend: bool) {
    let len = raw.len();
    container[..len].copy_from_slice(raw);
    let negative = sign_extend && len > 0 && raw[len - 1] & 0x80 != 0;
    container[len..].fill(if negative { 0xff } else { 0 });
}

/// Copies the lowest bytes of `container` to `raw`, dropping the highest bytes.
#[inline(always)]
pub(crate) fn narrow(container: &[u8], raw: &mut [u8]) {
    let len = raw.len();
    raw.copy_from_slice(&container[..len]);
}
