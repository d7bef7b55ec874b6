
use std::fs::File;
use std::io::{BufReader, Read};

pub(crate) trait ReaderExtension {
    /// Reads a `{ length: u8, bytes: length × u8 }` string.
    fn read_short_string(&mut self) -> Result<String, std::io::Error>;
}

impl ReaderExtension for BufReader<File> {
    fn read_short_string(&mut self) -> Result<String, std::io::Error> {
        let mut length = [0u8; 1];
        self.read_exact(&mut length)?;
        let mut bytes = vec![0u8; length[0] as usize];
        self.read_exact(&mut bytes)?;
        String::from_utf8(bytes)
            .map_err(|error| std::io::Error::new(std::io::ErrorKind::InvalidData, error))
    }
}
