//! Socket tuning shared by server and client.

use std::io;

use mio::net::TcpStream;

/// TCP_NODELAY plus, on unix, SO_SNDBUF/SO_RCVBUF.
///
/// Buffer sizing is best effort; not every platform honours it.
pub fn tune_stream(stream: &TcpStream, buffer_size: Option<usize>) -> io::Result<()> {
    stream.set_nodelay(true)?;

    #[cfg(unix)]
    {
        if let Some(size) = buffer_size {
            use std::os::unix::io::AsRawFd;

            let fd = stream.as_raw_fd();
            let optval: libc::c_int = size.min(libc::c_int::MAX as usize) as libc::c_int;
            for option in [libc::SO_SNDBUF, libc::SO_RCVBUF] {
                // SAFETY: fd is a live socket owned by `stream`, optval outlives the call
                unsafe {
                    libc::setsockopt(
                        fd,
                        libc::SOL_SOCKET,
                        option,
                        &optval as *const _ as *const libc::c_void,
                        std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                    );
                }
            }
        }
    }

    #[cfg(not(unix))]
    let _ = buffer_size;

    Ok(())
}
