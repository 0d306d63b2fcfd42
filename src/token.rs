//! Lexical events that drive the tree builder.
//!
//! `Tokenizer` adapts a `quick_xml::Reader` into a stream of `Token`s.
//! Names are reported as written; prefixes are never resolved.

use std::borrow::Cow;
use std::io::BufRead;

use quick_xml::encoding::Decoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
    },
    EndTag {
        name: String,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        instruction: String,
    },
    Directive(String),
}

pub struct Tokenizer<R> {
    reader: Reader<R>,
    buffer: Vec<u8>,
    pending: Option<Token>,
    done: bool,
}

impl<R: BufRead> Tokenizer<R> {
    pub fn new(source: R) -> Tokenizer<R> {
        Tokenizer {
            reader: Reader::from_reader(source),
            buffer: Vec::new(),
            pending: None,
            done: false,
        }
    }

    fn read(&mut self) -> Result<Option<Token>, Error> {
        let Tokenizer { reader, buffer, pending, .. } = self;

        loop {
            buffer.clear();
            let decoder = reader.decoder();

            let token = match reader.read_event_into(buffer)? {
                Event::Start(e) => start_tag(decoder, &e)?,
                Event::Empty(e) => {
                    let token = start_tag(decoder, &e)?;
                    *pending = Some(Token::EndTag {
                        name: decode(decoder, e.name().as_ref())?,
                    });
                    token
                }
                Event::End(e) => Token::EndTag {
                    name: decode(decoder, e.name().as_ref())?,
                },
                Event::Text(e) => {
                    let text = e.unescape().map_err(quick_xml::Error::from)?;
                    if text.is_empty() {
                        continue;
                    }
                    Token::Text(text.into_owned())
                }
                Event::CData(e) => Token::Text(decode(decoder, &e)?),
                Event::Comment(e) => Token::Comment(decode(decoder, &e)?),
                Event::Decl(e) => {
                    let (_, instruction) = split_instruction(decode(decoder, &e)?);
                    Token::ProcessingInstruction {
                        target: "xml".to_owned(),
                        instruction,
                    }
                }
                Event::PI(e) => {
                    let (target, instruction) = split_instruction(decode(decoder, &e)?);
                    Token::ProcessingInstruction { target, instruction }
                }
                Event::DocType(e) => Token::Directive(format!("DOCTYPE {}", decode(decoder, &e)?)),
                Event::Eof => return Ok(None),
            };

            return Ok(Some(token));
        }
    }
}

impl<R: BufRead> Iterator for Tokenizer<R> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Result<Token, Error>> {
        if let Some(token) = self.pending.take() {
            return Some(Ok(token));
        }
        if self.done {
            return None;
        }

        match self.read() {
            Ok(Some(token)) => Some(Ok(token)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn decode(decoder: Decoder, bytes: &[u8]) -> Result<String, Error> {
    let text = decoder.decode(bytes).map_err(quick_xml::Error::from)?;
    Ok(Cow::into_owned(text))
}

fn start_tag(decoder: Decoder, start: &BytesStart) -> Result<Token, Error> {
    let name = decode(decoder, start.name().as_ref())?;

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = decode(decoder, attribute.key.as_ref())?;
        let value = attribute.unescape_value().map_err(quick_xml::Error::from)?;
        attributes.push((key, value.into_owned()));
    }

    Ok(Token::StartTag { name, attributes })
}

/// Splits `<?target instruction?>` content at the first whitespace.
fn split_instruction(content: String) -> (String, String) {
    match content.find(char::is_whitespace) {
        Some(i) => {
            let instruction = content[i..].trim_start().to_owned();
            let mut target = content;
            target.truncate(i);
            (target, instruction)
        }
        None => (content, String::new()),
    }
}

#[cfg(test)]
mod test {
    use super::{split_instruction, Token, Tokenizer};

    fn tokens(xml: &str) -> Vec<Token> {
        Tokenizer::new(xml.as_bytes())
            .collect::<Result<_, _>>()
            .expect("well-formed input")
    }

    fn start(name: &str, attributes: &[(&str, &str)]) -> Token {
        Token::StartTag {
            name: name.to_owned(),
            attributes: attributes.iter().map(|&(k, v)| (k.to_owned(), v.to_owned())).collect(),
        }
    }

    fn end(name: &str) -> Token {
        Token::EndTag { name: name.to_owned() }
    }

    #[test]
    fn elements_and_attributes() {
        assert_eq!(
            tokens(r#"<a:b x="1" y:z='&lt;2'>hi</a:b>"#),
            vec![
                start("a:b", &[("x", "1"), ("y:z", "<2")]),
                Token::Text("hi".to_owned()),
                end("a:b"),
            ]
        );
    }

    #[test]
    fn empty_elements_are_closed_immediately() {
        assert_eq!(tokens("<a><b/></a>"), vec![start("a", &[]), start("b", &[]), end("b"), end("a")]);
    }

    #[test]
    fn character_data_becomes_text() {
        assert_eq!(
            tokens("<a>x<![CDATA[<y>]]>&amp;</a>"),
            vec![
                start("a", &[]),
                Token::Text("x".to_owned()),
                Token::Text("<y>".to_owned()),
                Token::Text("&".to_owned()),
                end("a"),
            ]
        );
    }

    #[test]
    fn prolog_events() {
        assert_eq!(
            tokens("<?xml version=\"1.0\"?><!DOCTYPE a><?style href=\"s.css\"?><!--note--><a/>"),
            vec![
                Token::ProcessingInstruction {
                    target: "xml".to_owned(),
                    instruction: "version=\"1.0\"".to_owned(),
                },
                Token::Directive("DOCTYPE a".to_owned()),
                Token::ProcessingInstruction {
                    target: "style".to_owned(),
                    instruction: "href=\"s.css\"".to_owned(),
                },
                Token::Comment("note".to_owned()),
                start("a", &[]),
                end("a"),
            ]
        );
    }

    #[test]
    fn syntax_errors_end_the_stream() {
        let mut tokenizer = Tokenizer::new("<a></b>".as_bytes());

        assert_eq!(tokenizer.next().map(Result::ok), Some(Some(start("a", &[]))));
        assert!(matches!(tokenizer.next(), Some(Err(_))));
        assert!(tokenizer.next().is_none());
    }

    #[test]
    fn instructions_split_at_whitespace() {
        assert_eq!(split_instruction("target".to_owned()), ("target".to_owned(), String::new()));
        assert_eq!(
            split_instruction("target  a b".to_owned()),
            ("target".to_owned(), "a b".to_owned())
        );
    }
}
