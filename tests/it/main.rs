mod dispatch;

use std::{cell::RefCell, rc::Rc};

use cmdtree::App;
use expect_test::Expect;

/// Lines written by actions, in order.
#[derive(Clone, Default)]
pub(crate) struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub(crate) fn push(&self, line: impl Into<String>) {
        self.0.borrow_mut().push(line.into());
    }

    fn take(&self) -> Vec<String> {
        self.0.take()
    }
}

/// Runs `app` on whitespace-separated `args` and compares what the actions
/// logged, or the error.
pub(crate) fn check(app: App, log: &Log, args: &str, expect: Expect) {
    let args = args.split_ascii_whitespace().map(String::from).collect::<Vec<_>>();
    let app = app.usage_reporter(|_, _| ());
    match app.run(args) {
        Ok(()) => expect.assert_eq(&log.take().join("\n")),
        Err(err) => {
            let mut lines = log.take();
            lines.push(format!("error: {err}"));
            expect.assert_eq(&lines.join("\n"))
        }
    }
}
