//! Length-prefixed envelopes over any blocking bidirectional byte channel.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::trace;

use crate::{Error, Result};

/// Writes `buf` as one framed envelope: a little-endian `u32` length
/// followed by the payload. Loops internally until the whole envelope is
/// written or the channel fails.
pub fn send_frame<W: Write>(w: &mut W, buf: &[u8]) -> Result<()> {
    let len: u32 = buf
        .len()
        .try_into()
        .map_err(|_| Error::transport("frame payload exceeds u32::MAX"))?;
    w.write_u32::<LittleEndian>(len)?;
    w.write_all(buf)?;
    w.flush()?;
    trace!("send_frame: {len} bytes");
    Ok(())
}

/// Reads one framed envelope and returns its payload. Any short read or
/// channel error is reported as [`Error::Transport`].
pub fn recv_frame<R: Read>(r: &mut R) -> Result<Vec<u8>> {
    let len = r.read_u32::<LittleEndian>()?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    trace!("recv_frame: {len} bytes");
    Ok(buf)
}

/// Disables Nagle's algorithm on a TCP stream so framed round-trips are not
/// held back waiting to coalesce with a following write.
pub fn tune_tcp_stream(stream: &std::net::TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;
    Ok(())
}
