use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    task::JoinHandle,
};
use tracing::trace;

/// Read `reader` line by line and hand each line to `on_line` until EOF.
///
/// The worker ends on its own when the pipe closes. Invalid UTF-8 is replaced lossily
/// so that a chatty child is never blocked on a full pipe.
pub(crate) fn forward_lines<R, F>(reader: R, mut on_line: F) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    F: FnMut(&str) + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::with_capacity(256);
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    on_line(line.trim_end_matches(['\n', '\r']));
                }
                Err(e) => {
                    trace!(target: "ddc.exec.pool", error = %e, "output stream closed with error");
                    break;
                }
            }
        }
    })
}
