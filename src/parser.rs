use std::io::BufRead;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{DecodeError, Error};
use crate::model::{Issued, Package, Reference, Update};

/// Owned view of one reader event
///
/// Converting each event before acting on it releases the reader's scratch
/// buffer, so the materializing functions below can keep pulling events.
enum Token {
    Open(BytesStart<'static>),
    Leaf(BytesStart<'static>),
    Close,
    Text(String),
    Eof,
    Other,
}

/// Pull-style iterator over the `<update>` elements of an updateinfo feed
///
/// The document is tokenized forward-only; only the subtree of the current
/// `<update>` is materialized and everything outside of it is skipped. The
/// iterator stops after end of input or after the first error.
///
/// The format is:
/// ```text
/// <updates>
///   <update type="security" status="stable">
///     <id>..</id> <title>..</title> <severity>..</severity> <release>..</release>
///     <issued date="EPOCH-SECONDS"/>
///     <references><reference href=".." id=".." title=".." type=".."/></references>
///     <description>..</description>
///     <pkglist><collection>
///       <package name=".." version=".." release=".." arch=".."><filename>..</filename></package>
///     </collection></pkglist>
///   </update>
/// </updates>
/// ```
pub struct UpdateStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> UpdateStream<R> {
    pub fn new(input: R) -> Self {
        UpdateStream {
            reader: Reader::from_reader(input),
            buf: Vec::new(),
            done: false,
        }
    }

    /// Byte offset the reader has consumed up to
    pub fn byte_offset(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    /// Scan for the next `<update>` start tag and materialize its subtree
    pub fn next_update(&mut self) -> Result<Option<Update>, Error> {
        self.scan().map_err(|source| Error::Decode {
            position: self.byte_offset(),
            source,
        })
    }

    fn scan(&mut self) -> Result<Option<Update>, DecodeError> {
        loop {
            match self.next_token()? {
                Token::Open(e) if is_update(&e) => {
                    let mut update = Update::from_start(&e)?;
                    self.read_update_body(&mut update)?;
                    return Ok(Some(update));
                }
                Token::Leaf(e) if is_update(&e) => return Ok(Some(Update::from_start(&e)?)),
                Token::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, DecodeError> {
        self.buf.clear();
        let token = match self.reader.read_event_into(&mut self.buf)? {
            Event::Start(e) => Token::Open(e.into_owned()),
            Event::Empty(e) => Token::Leaf(e.into_owned()),
            Event::End(_) => Token::Close,
            Event::Text(t) => Token::Text(t.unescape()?.into_owned()),
            Event::CData(t) => Token::Text(self.reader.decoder().decode(&t)?.into_owned()),
            Event::Eof => Token::Eof,
            _ => Token::Other,
        };
        Ok(token)
    }

    fn read_update_body(&mut self, update: &mut Update) -> Result<(), DecodeError> {
        loop {
            match self.next_token()? {
                Token::Open(e) => match e.local_name().as_ref() {
                    b"id" => update.id = self.read_text("id")?,
                    b"title" => update.title = self.read_text("title")?,
                    b"severity" => update.severity = self.read_text("severity")?,
                    b"release" => update.release = self.read_text("release")?,
                    b"description" => update.description = self.read_text("description")?,
                    b"issued" => {
                        update.issued = Issued::from_start(&e)?;
                        self.skip_element("issued")?;
                    }
                    b"references" => self.read_references(&mut update.references)?,
                    b"pkglist" => self.read_pkglist(&mut update.packages)?,
                    _ => self.skip_element("update")?,
                },
                Token::Leaf(e) => match e.local_name().as_ref() {
                    b"id" => update.id.clear(),
                    b"title" => update.title.clear(),
                    b"severity" => update.severity.clear(),
                    b"release" => update.release.clear(),
                    b"description" => update.description.clear(),
                    b"issued" => update.issued = Issued::from_start(&e)?,
                    _ => {}
                },
                Token::Close => return Ok(()),
                Token::Eof => return Err(DecodeError::UnexpectedEof("update")),
                Token::Text(_) | Token::Other => {}
            }
        }
    }

    fn read_references(&mut self, references: &mut Vec<Reference>) -> Result<(), DecodeError> {
        loop {
            match self.next_token()? {
                Token::Open(e) => {
                    if e.local_name().as_ref() == b"reference" {
                        references.push(Reference::from_start(&e)?);
                    }
                    self.skip_element("references")?;
                }
                Token::Leaf(e) if e.local_name().as_ref() == b"reference" => {
                    references.push(Reference::from_start(&e)?);
                }
                Token::Close => return Ok(()),
                Token::Eof => return Err(DecodeError::UnexpectedEof("references")),
                _ => {}
            }
        }
    }

    fn read_pkglist(&mut self, packages: &mut Vec<Package>) -> Result<(), DecodeError> {
        loop {
            match self.next_token()? {
                Token::Open(e) if e.local_name().as_ref() == b"collection" => {
                    self.read_collection(packages)?;
                }
                Token::Open(_) => self.skip_element("pkglist")?,
                Token::Close => return Ok(()),
                Token::Eof => return Err(DecodeError::UnexpectedEof("pkglist")),
                _ => {}
            }
        }
    }

    fn read_collection(&mut self, packages: &mut Vec<Package>) -> Result<(), DecodeError> {
        loop {
            match self.next_token()? {
                Token::Open(e) if e.local_name().as_ref() == b"package" => {
                    let mut package = Package::from_start(&e)?;
                    self.read_package_body(&mut package)?;
                    packages.push(package);
                }
                Token::Leaf(e) if e.local_name().as_ref() == b"package" => {
                    packages.push(Package::from_start(&e)?);
                }
                Token::Open(_) => self.skip_element("collection")?,
                Token::Close => return Ok(()),
                Token::Eof => return Err(DecodeError::UnexpectedEof("collection")),
                _ => {}
            }
        }
    }

    fn read_package_body(&mut self, package: &mut Package) -> Result<(), DecodeError> {
        loop {
            match self.next_token()? {
                Token::Open(e) if e.local_name().as_ref() == b"filename" => {
                    package.filename = self.read_text("filename")?;
                }
                Token::Open(_) => self.skip_element("package")?,
                Token::Leaf(e) if e.local_name().as_ref() == b"filename" => package.filename.clear(),
                Token::Close => return Ok(()),
                Token::Eof => return Err(DecodeError::UnexpectedEof("package")),
                _ => {}
            }
        }
    }

    /// Collect the text directly inside the element just opened, up to its end tag
    ///
    /// Text of nested elements is ignored.
    fn read_text(&mut self, element: &'static str) -> Result<String, DecodeError> {
        let mut text = String::new();
        loop {
            match self.next_token()? {
                Token::Text(t) => text.push_str(&t),
                Token::Open(_) => self.skip_element(element)?,
                Token::Close => return Ok(text),
                Token::Eof => return Err(DecodeError::UnexpectedEof(element)),
                Token::Leaf(_) | Token::Other => {}
            }
        }
    }

    /// Consume everything up to and including the end tag of the element just opened
    fn skip_element(&mut self, element: &'static str) -> Result<(), DecodeError> {
        let mut depth = 0usize;
        loop {
            match self.next_token()? {
                Token::Open(_) => depth += 1,
                Token::Close if depth == 0 => return Ok(()),
                Token::Close => depth -= 1,
                Token::Eof => return Err(DecodeError::UnexpectedEof(element)),
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for UpdateStream<R> {
    type Item = Result<Update, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_update() {
            Ok(Some(update)) => Some(Ok(update)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for UpdateStream<R> {}

fn is_update(start: &BytesStart) -> bool {
    start.local_name().as_ref() == b"update"
}
