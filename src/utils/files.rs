use tokio::{
    fs::File,
    io::{self, AsyncBufReadExt, AsyncRead},
};

/// Read a file from the given path into a list of strings
pub async fn read_file(path: &str) -> io::Result<Vec<String>> {
    let f = File::open(path).await?;

    read_lines(f).await
}

/// Read every line from an async reader, such as stdin
pub async fn read_lines<R: AsyncRead + Unpin>(reader: R) -> io::Result<Vec<String>> {
    let mut r = io::BufReader::new(reader).lines();
    let mut lines = Vec::new();

    while let Some(line) = r.next_line().await? {
        lines.push(line);
    }

    Ok(lines)
}

/// Read a label vocabulary file with one label per line, skipping blank lines
pub async fn read_labels(path: &str) -> io::Result<Vec<String>> {
    Ok(read_file(path)
        .await?
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}
