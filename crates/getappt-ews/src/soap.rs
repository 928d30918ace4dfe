//! SOAP envelopes for the three EWS operations we use, and the readers for
//! their responses.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;

use crate::error::EwsError;
use crate::types::*;
use crate::xml::XmlNode;

pub const TYPES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/types";
pub const MESSAGES_NS: &str = "http://schemas.microsoft.com/exchange/services/2006/messages";
const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// `SOAPAction` header value for an operation name.
pub fn soap_action(operation: &str) -> String {
    format!("{}/{}", MESSAGES_NS, operation)
}

/// Wrap an operation body in a SOAP envelope carrying the server version.
pub fn envelope(version: ExchangeVersion, body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="{soap}" xmlns:t="{types}" xmlns:m="{messages}">"#,
            r#"<soap:Header><t:RequestServerVersion Version="{version}"/></soap:Header>"#,
            r#"<soap:Body>{body}</soap:Body>"#,
            r#"</soap:Envelope>"#
        ),
        soap = SOAP_NS,
        types = TYPES_NS,
        messages = MESSAGES_NS,
        version = version.as_str(),
        body = body,
    )
}

/// `GetFolder` for the well-known calendar of `mailbox`, id-only shape.
pub fn get_folder_request(mailbox: &str) -> String {
    format!(
        concat!(
            r#"<m:GetFolder>"#,
            r#"<m:FolderShape><t:BaseShape>IdOnly</t:BaseShape></m:FolderShape>"#,
            r#"<m:FolderIds>"#,
            r#"<t:DistinguishedFolderId Id="calendar">"#,
            r#"<t:Mailbox><t:EmailAddress>{mailbox}</t:EmailAddress></t:Mailbox>"#,
            r#"</t:DistinguishedFolderId>"#,
            r#"</m:FolderIds>"#,
            r#"</m:GetFolder>"#
        ),
        mailbox = escape(mailbox),
    )
}

const APPOINTMENT_FIELDS: [&str; 5] = [
    "item:Subject",
    "calendar:Start",
    "calendar:End",
    "calendar:Location",
    "calendar:LegacyFreeBusyStatus",
];

/// `FindItem` over a calendar view, projecting the appointment fields.
pub fn find_item_request(folder: &CalendarFolder, view: &CalendarView) -> String {
    let fields: String = APPOINTMENT_FIELDS
        .iter()
        .map(|f| format!(r#"<t:FieldURI FieldURI="{}"/>"#, f))
        .collect();

    let change_key = folder
        .change_key
        .as_deref()
        .map(|ck| format!(r#" ChangeKey="{}""#, escape(ck)))
        .unwrap_or_default();

    format!(
        concat!(
            r#"<m:FindItem Traversal="Shallow">"#,
            r#"<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape>"#,
            r#"<t:AdditionalProperties>{fields}</t:AdditionalProperties>"#,
            r#"</m:ItemShape>"#,
            r#"<m:CalendarView MaxEntriesReturned="{max}" StartDate="{start}" EndDate="{end}"/>"#,
            r#"<m:ParentFolderIds><t:FolderId Id="{id}"{change_key}/></m:ParentFolderIds>"#,
            r#"</m:FindItem>"#
        ),
        fields = fields,
        max = view.max_entries,
        start = format_utc(view.start),
        end = format_utc(view.end),
        id = escape(folder.id.as_str()),
        change_key = change_key,
    )
}

/// `GetUserAvailability` for all mailboxes in one request.
///
/// Times are sent in a zero-bias time zone, so the server answers in UTC.
pub fn get_user_availability_request(mailboxes: &[String], options: &AvailabilityOptions) -> String {
    let mailbox_data: String = mailboxes
        .iter()
        .map(|m| {
            format!(
                concat!(
                    r#"<t:MailboxData>"#,
                    r#"<t:Email><t:Address>{}</t:Address></t:Email>"#,
                    r#"<t:AttendeeType>Required</t:AttendeeType>"#,
                    r#"<t:ExcludeConflicts>false</t:ExcludeConflicts>"#,
                    r#"</t:MailboxData>"#
                ),
                escape(m.as_str())
            )
        })
        .collect();

    let transition = concat!(
        r#"<t:Bias>0</t:Bias><t:Time>00:00:00</t:Time>"#,
        r#"<t:DayOrder>1</t:DayOrder><t:Month>1</t:Month><t:DayOfWeek>Sunday</t:DayOfWeek>"#
    );

    format!(
        concat!(
            r#"<m:GetUserAvailabilityRequest>"#,
            r#"<t:TimeZone><t:Bias>0</t:Bias>"#,
            r#"<t:StandardTime>{transition}</t:StandardTime>"#,
            r#"<t:DaylightTime>{transition}</t:DaylightTime>"#,
            r#"</t:TimeZone>"#,
            r#"<m:MailboxDataArray>{mailbox_data}</m:MailboxDataArray>"#,
            r#"<t:FreeBusyViewOptions>"#,
            r#"<t:TimeWindow><t:StartTime>{start}</t:StartTime><t:EndTime>{end}</t:EndTime></t:TimeWindow>"#,
            r#"<t:MergedFreeBusyIntervalInMinutes>{interval}</t:MergedFreeBusyIntervalInMinutes>"#,
            r#"<t:RequestedView>{view}</t:RequestedView>"#,
            r#"</t:FreeBusyViewOptions>"#,
            r#"</m:GetUserAvailabilityRequest>"#
        ),
        transition = transition,
        mailbox_data = mailbox_data,
        start = format_local(options.window.start),
        end = format_local(options.window.end),
        interval = options.merged_interval_minutes,
        view = options.view.as_str(),
    )
}

/// Turn a `soap:Fault` anywhere in the document into an error.
pub fn check_fault(doc: &XmlNode) -> Result<(), EwsError> {
    match doc.find("Fault") {
        Some(fault) => Err(EwsError::SoapFault {
            code: fault.child_text("faultcode").unwrap_or("Unknown").to_string(),
            message: fault.child_text("faultstring").unwrap_or_default().to_string(),
        }),
        None => Ok(()),
    }
}

/// Map a `ResponseClass="Error"` message to an error. Warnings pass.
fn check_response_message(message: &XmlNode) -> Result<(), EwsError> {
    match message.attr("ResponseClass") {
        Some("Error") => Err(response_error(message)),
        Some("Warning") => {
            tracing::warn!(
                code = message.child_text("ResponseCode").unwrap_or_default(),
                "EWS warning: {}",
                message.child_text("MessageText").unwrap_or_default()
            );
            Ok(())
        }
        _ => Ok(()),
    }
}

fn response_error(message: &XmlNode) -> EwsError {
    EwsError::Response {
        code: message.child_text("ResponseCode").unwrap_or("Unknown").to_string(),
        message: message.child_text("MessageText").unwrap_or_default().to_string(),
    }
}

fn required<'a>(node: &'a XmlNode, name: &str, context: &str) -> Result<&'a XmlNode, EwsError> {
    node.find(name)
        .ok_or_else(|| EwsError::InvalidResponse(format!("{}: missing {}", context, name)))
}

/// Read the calendar folder id from a `GetFolder` response.
pub fn parse_get_folder(doc: &XmlNode, mailbox: &str) -> Result<CalendarFolder, EwsError> {
    let message = required(doc, "GetFolderResponseMessage", "GetFolder")?;
    check_response_message(message)?;

    let folder_id = required(message, "FolderId", "GetFolder")?;
    let id = folder_id
        .attr("Id")
        .ok_or_else(|| EwsError::InvalidResponse("GetFolder: FolderId without Id".to_string()))?;

    Ok(CalendarFolder {
        mailbox: mailbox.to_string(),
        id: id.to_string(),
        change_key: folder_id.attr("ChangeKey").map(str::to_string),
    })
}

/// Read the projected appointments from a `FindItem` response.
pub fn parse_find_item(doc: &XmlNode) -> Result<Vec<Appointment>, EwsError> {
    let message = required(doc, "FindItemResponseMessage", "FindItem")?;
    check_response_message(message)?;

    let Some(items) = message.find("Items") else {
        return Ok(Vec::new());
    };

    items
        .children_named("CalendarItem")
        .map(|item| -> Result<Appointment, EwsError> {
            Ok(Appointment {
                subject: item.child_text("Subject").map(str::to_string),
                start: parse_datetime(item.child_text("Start"), "CalendarItem/Start")?,
                end: parse_datetime(item.child_text("End"), "CalendarItem/End")?,
                location: item.child_text("Location").map(str::to_string),
                free_busy_status: item
                    .child_text("LegacyFreeBusyStatus")
                    .map(FreeBusyStatus::from_wire)
                    .unwrap_or(FreeBusyStatus::NoData),
            })
        })
        .collect()
}

/// Read per-mailbox results from a `GetUserAvailability` response.
///
/// The server answers in request order; results are paired with
/// `mailboxes` positionally. A mailbox-level error is kept on that entry
/// instead of failing the whole batch.
pub fn parse_get_user_availability(
    doc: &XmlNode,
    mailboxes: &[String],
) -> Result<Vec<AttendeeAvailability>, EwsError> {
    let array = required(doc, "FreeBusyResponseArray", "GetUserAvailability")?;
    let responses: Vec<&XmlNode> = array.children_named("FreeBusyResponse").collect();

    if responses.len() != mailboxes.len() {
        return Err(EwsError::InvalidResponse(format!(
            "GetUserAvailability: expected {} responses, got {}",
            mailboxes.len(),
            responses.len()
        )));
    }

    responses
        .into_iter()
        .zip(mailboxes)
        .map(|(response, mailbox)| parse_free_busy_response(response, mailbox))
        .collect()
}

fn parse_free_busy_response(
    response: &XmlNode,
    mailbox: &str,
) -> Result<AttendeeAvailability, EwsError> {
    let error = response
        .child("ResponseMessage")
        .filter(|m| m.attr("ResponseClass") == Some("Error"))
        .map(|m| response_error(m).to_string());

    if let Some(error) = &error {
        tracing::warn!(mailbox, "Free/busy lookup failed: {}", error);
    }

    let view = response.child("FreeBusyView");

    let merged_free_busy = view
        .and_then(|v| v.child_text("MergedFreeBusy"))
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let events = match view.and_then(|v| v.child("CalendarEventArray")) {
        Some(array) => array
            .children_named("CalendarEvent")
            .map(parse_calendar_event)
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok(AttendeeAvailability {
        mailbox: mailbox.to_string(),
        events,
        merged_free_busy,
        error,
    })
}

fn parse_calendar_event(event: &XmlNode) -> Result<CalendarEvent, EwsError> {
    let details = event.child("CalendarEventDetails").map(|d| CalendarEventDetails {
        subject: d.child_text("Subject").map(str::to_string),
        location: d.child_text("Location").map(str::to_string),
        is_meeting: flag(d, "IsMeeting"),
        is_recurring: flag(d, "IsRecurring"),
        is_exception: flag(d, "IsException"),
        is_reminder_set: flag(d, "IsReminderSet"),
        is_private: flag(d, "IsPrivate"),
    });

    Ok(CalendarEvent {
        start: parse_datetime(event.child_text("StartTime"), "CalendarEvent/StartTime")?,
        end: parse_datetime(event.child_text("EndTime"), "CalendarEvent/EndTime")?,
        busy_type: event
            .child_text("BusyType")
            .map(FreeBusyStatus::from_wire)
            .unwrap_or(FreeBusyStatus::NoData),
        details,
    })
}

fn flag(node: &XmlNode, name: &str) -> bool {
    node.child_text(name) == Some("true")
}

/// EWS timestamps carry either an offset or none; offset-less values are in
/// the request time zone, which is always UTC here.
pub fn parse_ews_datetime(value: &str) -> Result<DateTime<Utc>, EwsError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| EwsError::InvalidResponse(format!("bad timestamp '{}': {}", value, e)))
}

fn parse_datetime(value: Option<&str>, context: &str) -> Result<DateTime<Utc>, EwsError> {
    let value =
        value.ok_or_else(|| EwsError::InvalidResponse(format!("{}: missing timestamp", context)))?;
    parse_ews_datetime(value)
}

fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn format_local(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
