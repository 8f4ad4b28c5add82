use std::{
    cell::Cell,
    io::{self, Read},
    rc::Rc,
};

use bfssa::exec::executor::execute;
use bfssa::lexer::LexerError;
use bfssa::translator::Translator;
use bfssa::{translate, TranslateError, TranslatorOptions};

/// Remembers whether the translator ever saw the end of the stream
struct EofTracker {
    data: &'static [u8],
    hit_eof: Rc<Cell<bool>>,
}

impl Read for EofTracker {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let read = self.data.read(buf)?;
        if read == 0 {
            self.hit_eof.set(true);
        }
        Ok(read)
    }
}

/// Hands out `data` then fails every read after it
struct BrokenPipe {
    data: &'static [u8],
}

impl Read for BrokenPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.data.is_empty() {
            return Err(io::Error::new(io::ErrorKind::Other, "pipe went away"));
        }
        self.data.read(buf)
    }
}

#[test]
fn lone_close_fails_on_the_first_byte() {
    let mut translator = Translator::new("]+++".as_bytes(), &TranslatorOptions::default());
    match translator.step() {
        Err(TranslateError::UnmatchedClose { line: 1, column: 1 }) => {}
        other => panic!("expected UnmatchedClose at 1:1, got {:?}", other),
    }
}

#[test]
fn lone_open_fails_only_after_the_whole_stream() {
    let hit_eof = Rc::new(Cell::new(false));
    let reader = EofTracker {
        data: b"[+++ still going",
        hit_eof: hit_eof.clone(),
    };

    let mut translator = Translator::new(reader, &TranslatorOptions::default());
    // every byte is accepted
    while translator.step().unwrap() {}
    assert!(hit_eof.get());
    assert_eq!(translator.loop_depth(), 1);

    match translator.translate() {
        Err(TranslateError::UnmatchedOpen { line: 1, column: 1 }) => {}
        other => panic!("expected UnmatchedOpen at 1:1, got {:?}", other.map(|t| t.stats)),
    }
}

#[test]
fn nested_loops_go_two_deep_then_back_to_zero() {
    let mut translator = Translator::new("[[]]".as_bytes(), &TranslatorOptions::default());
    let mut depths = vec![];
    while translator.step().unwrap() {
        depths.push(translator.loop_depth());
    }
    assert_eq!(depths, vec![1, 2, 1, 0]);

    let translation = translator.translate().unwrap();
    let body = translation.module.entry_body();
    let position = |label: &str| {
        body.blocks_in_order()
            .position(|(_, block)| block.label == label)
            .unwrap()
    };
    // inner exit is exit4, outer is exit2
    assert!(position("exit2") > position("exit4"));
}

#[test]
fn clear_loop_prints_as_llvm_ir() {
    let translation = translate("[-]>".as_bytes(), &TranslatorOptions::default()).unwrap();
    let expected = "\
; ModuleID = 'brainfuck program'
source_filename = \"brainfuck program\"

@data = internal global [30000 x i8] zeroinitializer

declare void @brainfuck_put(i8)

declare i8 @brainfuck_get()

define void @brainfuck_main() {
entry:
  %cell1 = load i8, ptr @data
  %cond2 = icmp ne i8 %cell1, 0
  br i1 %cond2, label %loop1, label %exit2

loop1:
  %ptr4 = phi ptr [ @data, %entry ], [ %ptr4, %loop1 ]
  %cell5 = load i8, ptr %ptr4
  %cell6 = sub i8 %cell5, 1
  store i8 %cell6, ptr %ptr4
  %cell7 = load i8, ptr %ptr4
  %cond8 = icmp ne i8 %cell7, 0
  br i1 %cond8, label %loop1, label %exit2

exit2:
  %ptr3 = phi ptr [ @data, %entry ], [ %ptr4, %loop1 ]
  %ptr9 = getelementptr i8, ptr %ptr3, i64 1
  ret void
}
";
    assert_eq!(translation.module.to_string(), expected);
}

#[test]
fn module_name_goes_into_the_header() {
    let options = TranslatorOptions {
        module_name: "hello".to_string(),
    };
    let text = translate("".as_bytes(), &options).unwrap().module.to_string();
    assert!(text.starts_with("; ModuleID = 'hello'\nsource_filename = \"hello\"\n"));
}

#[test]
fn loops_move_the_pointer_between_iterations() {
    // copies cell 0 (5) into cell 1 then prints cell 1
    let translation = translate(
        "+++++[->+<]>.".as_bytes(),
        &TranslatorOptions::default(),
    )
    .unwrap();
    assert_eq!(execute(&translation.module, b"", None).unwrap(), vec![5]);
}

#[test]
fn pointer_drifting_loop_uses_the_join() {
    // walks right over the non-zero cells then bumps the first zero one twice
    let translation = translate(
        "+>+>+<<[>]++.".as_bytes(),
        &TranslatorOptions::default(),
    )
    .unwrap();
    let output = execute(&translation.module, b"", Some(1_000)).unwrap();
    assert_eq!(output, vec![2]);
}

#[test]
fn cat_until_end_of_input() {
    let translation = translate(",[.,]".as_bytes(), &TranslatorOptions::default()).unwrap();
    assert_eq!(execute(&translation.module, b"ssa form", None).unwrap(), b"ssa form");
}

#[test]
fn read_failure_stops_translation() {
    let reader = BrokenPipe { data: b"++[>+<-" };
    match translate(reader, &TranslatorOptions::default()) {
        Err(TranslateError::Lexer(LexerError::FileIO(e))) => {
            assert_eq!(e.kind(), io::ErrorKind::Other);
        }
        other => panic!("expected a read error, got {:?}", other.map(|t| t.stats)),
    }
}

#[test]
fn read_failure_message_names_the_cause() {
    let reader = BrokenPipe { data: b"" };
    let error = translate(reader, &TranslatorOptions::default()).unwrap_err();
    assert_eq!(error.to_string(), "Failed to read program: IO Error: pipe went away");
}

#[test]
fn deeply_nested_loops_close_in_order() {
    let depth = 50_000;
    let program = format!("{}{}", "[".repeat(depth), "]".repeat(depth));
    let translation = translate(program.as_bytes(), &TranslatorOptions::default()).unwrap();
    assert_eq!(translation.stats.max_loop_depth, depth);

    let body = translation.module.entry_body();
    assert_eq!(body.blocks_in_order().count(), 1 + 2 * depth);

    // each `]` puts its exit after the tail, so the innermost exit comes first
    let exits: Vec<usize> = body
        .blocks_in_order()
        .filter(|(_, block)| block.label.starts_with("exit"))
        .map(|(id, _)| id.index())
        .collect();
    assert_eq!(exits.len(), depth);
    assert!(exits.windows(2).all(|pair| pair[0] > pair[1]));
}
